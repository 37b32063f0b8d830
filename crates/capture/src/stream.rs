//! 관측 스트림 -- 프레임 소스를 `PacketObservation` 시퀀스로 변환
//!
//! [`ObservationStream`]은 지연 평가되는 유한 이터레이터입니다.
//! - 수용한 IP 패킷이 `max_count`개가 되면 종료
//! - 소스 소진, 캡처 에러, 취소 이후에는 계속 `None` (재시작 불가)
//! - Ethernet/IP가 아닌 프레임은 세지 않고 버림

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

use lanwarden_core::error::CaptureError;
use lanwarden_core::metrics as m;
use lanwarden_core::time::format_time;
use lanwarden_core::types::{PacketObservation, UNKNOWN};

use crate::decode::decode_frame;
use crate::dissect::dissect;
use crate::resolve::{HostResolver, ResolveCache};
use crate::source::{FramePoll, FrameSource, RawFrame};

/// 캡처 세션 하나의 관측 이터레이터
pub struct ObservationStream<S> {
    source: S,
    resolver: ResolveCache,
    cancel: CancellationToken,
    max_count: usize,
    accepted: usize,
    dropped: u64,
    last_time: Option<DateTime<Utc>>,
    finished: bool,
    cancelled: bool,
}

impl<S: FrameSource> ObservationStream<S> {
    pub fn new(
        source: S,
        resolver: Arc<dyn HostResolver>,
        max_count: usize,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            source,
            resolver: ResolveCache::new(resolver),
            cancel,
            max_count,
            accepted: 0,
            dropped: 0,
            last_time: None,
            finished: false,
            cancelled: false,
        }
    }

    /// 지금까지 수용한 패킷 수
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// IP 패킷이 아니어서 버린 프레임 수
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// 취소로 종료되었는지 여부
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    fn observe(&mut self, frame: &RawFrame) -> Option<PacketObservation> {
        let decoded = decode_frame(&frame.data)?;
        let app = dissect(&decoded);

        let (port_src, port_dst) = match decoded.transport.ports() {
            Some((src, dst)) => (src.to_string(), dst.to_string()),
            None => (UNKNOWN.to_owned(), UNKNOWN.to_owned()),
        };

        let mut ts = frame.timestamp.unwrap_or_else(Utc::now);
        if let Some(last) = self.last_time {
            if ts < last {
                ts = last;
            }
        }
        self.last_time = Some(ts);

        Some(PacketObservation {
            eth_src: decoded.eth_src,
            eth_dst: decoded.eth_dst,
            protocol: app.protocol.to_owned(),
            port_src,
            port_dst,
            size: frame.wire_len,
            time: format_time(ts),
            host: app.host.unwrap_or_else(|| UNKNOWN.to_owned()),
            hostname: self.resolver.hostname(decoded.src_ip),
        })
    }
}

impl<S: FrameSource> Iterator for ObservationStream<S> {
    type Item = Result<PacketObservation, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            if self.accepted >= self.max_count {
                self.finished = true;
                return None;
            }
            if self.cancel.is_cancelled() {
                tracing::info!(accepted = self.accepted, "capture stream cancelled");
                self.finished = true;
                self.cancelled = true;
                return None;
            }

            match self.source.poll_frame() {
                Ok(FramePoll::Frame(frame)) => match self.observe(&frame) {
                    Some(obs) => {
                        self.accepted += 1;
                        metrics::counter!(m::CAPTURE_PACKETS_TOTAL).increment(1);
                        return Some(Ok(obs));
                    }
                    None => {
                        self.dropped += 1;
                        metrics::counter!(m::CAPTURE_FRAMES_DROPPED_TOTAL).increment(1);
                    }
                },
                Ok(FramePoll::Idle) => {}
                Ok(FramePoll::Exhausted) => {
                    tracing::debug!(
                        source = %self.source.describe(),
                        accepted = self.accepted,
                        "frame source exhausted"
                    );
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    tracing::error!(source = %self.source.describe(), error = %e, "capture failed");
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<S: FrameSource> std::iter::FusedIterator for ObservationStream<S> {}
