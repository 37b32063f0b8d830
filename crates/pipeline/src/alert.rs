//! 알림 버스 -- 의심 행위 알림의 실시간 브로드캐스트
//!
//! [`AlertBus`]는 `tokio::sync::broadcast` 채널을 감쌉니다.
//! - `publish`는 블로킹하지 않으며 실패하지 않음 (구독자가 없으면 버림)
//! - 느린 구독자는 가장 오래된 알림을 잃음 (최대 한 번 전달)
//! - 한 발행자의 알림은 발행 순서대로 전달됨

use tokio::sync::broadcast;

use lanwarden_core::event::AlertEvent;
use lanwarden_core::metrics as m;

/// 의심 행위 알림 버스
#[derive(Debug, Clone)]
pub struct AlertBus {
    tx: broadcast::Sender<AlertEvent>,
}

impl AlertBus {
    /// `capacity`는 구독자별 미수신 알림 보관 한도입니다 (최소 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// 알림을 발행합니다. 전달된 구독자 수를 반환합니다.
    pub fn publish(&self, event: AlertEvent) -> usize {
        metrics::counter!(m::ALERTS_PUBLISHED_TOTAL).increment(1);
        match self.tx.send(event) {
            Ok(receivers) => receivers,
            Err(broadcast::error::SendError(event)) => {
                metrics::counter!(m::ALERTS_UNDELIVERED_TOTAL).increment(1);
                tracing::debug!(mac = %event.mac, "alert dropped, no subscribers");
                0
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AlertEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
