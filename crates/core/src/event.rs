//! 이벤트 시스템 -- 의심 행위 알림의 기본 단위
//!
//! [`AlertEvent`]는 의심 패킷 하나당 한 번 발행되는 일회성 알림입니다.
//! 알림은 저장되지 않으며, 발행 시점에 연결된 구독자에게만 전달됩니다.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{MacAddr, TrustState};

// --- 모듈명 상수 ---

/// 캡처 파이프라인 모듈명
pub const MODULE_CAPTURE_PIPELINE: &str = "capture-pipeline";
/// HTTP API 모듈명
pub const MODULE_API_SERVER: &str = "api-server";
/// 알림 모니터 모듈명
pub const MODULE_ALERT_MONITOR: &str = "alert-monitor";

/// 실시간 채널 이벤트 이름
pub const EVENT_SUSPICIOUS_BEHAVIOR: &str = "suspicious_behavior";

/// 이벤트 메타데이터 -- 모든 이벤트에 공통으로 포함되는 추적 정보
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMetadata {
    /// 이벤트 발생 시각
    pub timestamp: SystemTime,
    /// 이벤트를 생성한 모듈명
    pub source_module: String,
    /// 추적 ID -- 같은 캡처 세션의 이벤트를 연결합니다
    pub trace_id: String,
}

impl EventMetadata {
    /// 기존 trace_id를 사용하여 새 메타데이터를 생성합니다.
    pub fn new(source_module: impl Into<String>, trace_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            source_module: source_module.into(),
            trace_id: trace_id.into(),
        }
    }

    /// 새로운 UUID v4 trace_id로 메타데이터를 만듭니다.
    pub fn with_new_trace(source_module: impl Into<String>) -> Self {
        Self::new(source_module, uuid::Uuid::new_v4().to_string())
    }
}

/// 모든 이벤트가 구현하는 기본 trait
pub trait Event: Send + Sync + 'static {
    /// 이벤트 고유 ID (UUID v4)
    fn event_id(&self) -> &str;

    /// 이벤트 메타데이터
    fn metadata(&self) -> &EventMetadata;

    /// 이벤트 타입명 (로깅 및 라우팅에 사용)
    fn event_type(&self) -> &str;
}

/// 알림 유형
///
/// 패킷 처리 직전의 신뢰 상태로 결정됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmType {
    /// 처리 시점에 신뢰 상태가 Unknown이던 장치
    #[serde(rename = "New Suspicious Device")]
    NewSuspiciousDevice,
    /// 이미 신뢰 또는 차단 목록에 있던 장치
    #[serde(rename = "Existing Device Suspicious")]
    ExistingDeviceSuspicious,
}

impl AlarmType {
    /// 처리 직전 신뢰 상태에서 알림 유형을 결정합니다.
    pub fn for_prior_state(prior: TrustState) -> Self {
        match prior {
            TrustState::Unknown => Self::NewSuspiciousDevice,
            TrustState::Trusted | TrustState::Blocked => Self::ExistingDeviceSuspicious,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewSuspiciousDevice => "New Suspicious Device",
            Self::ExistingDeviceSuspicious => "Existing Device Suspicious",
        }
    }

    /// 사람이 읽는 알림 메시지
    pub fn message(&self, mac: &MacAddr) -> String {
        match self {
            Self::NewSuspiciousDevice => {
                format!("New device with MAC {mac} is exhibiting suspicious behavior.")
            }
            Self::ExistingDeviceSuspicious => {
                format!("Device with MAC {mac} has become suspicious.")
            }
        }
    }
}

impl fmt::Display for AlarmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 의심 행위 알림 이벤트
#[derive(Debug, Clone)]
pub struct AlertEvent {
    /// 이벤트 고유 ID
    pub id: String,
    /// 이벤트 메타데이터
    pub metadata: EventMetadata,
    /// 의심 패킷의 출발지 주소
    pub mac: MacAddr,
    /// 알림 유형
    pub alarm_type: AlarmType,
    /// 알림 메시지
    pub message: String,
    /// 원본 패킷의 캡처 시각
    pub time: String,
}

impl AlertEvent {
    /// 의심 패킷과 처리 직전 신뢰 상태로 알림을 생성합니다.
    pub fn suspicious(
        mac: MacAddr,
        prior: TrustState,
        time: impl Into<String>,
        trace_id: &str,
    ) -> Self {
        let alarm_type = AlarmType::for_prior_state(prior);
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            metadata: EventMetadata::new(MODULE_CAPTURE_PIPELINE, trace_id),
            mac,
            alarm_type,
            message: alarm_type.message(&mac),
            time: time.into(),
        }
    }

    /// 실시간 채널로 내보내는 페이로드
    pub fn payload(&self) -> AlertPayload {
        AlertPayload {
            mac: self.mac,
            alarm_type: self.alarm_type,
            message: self.message.clone(),
            time: self.time.clone(),
        }
    }
}

impl Event for AlertEvent {
    fn event_id(&self) -> &str {
        &self.id
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    fn event_type(&self) -> &str {
        EVENT_SUSPICIOUS_BEHAVIOR
    }
}

impl fmt::Display for AlertEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} {}", self.alarm_type, self.mac, self.time)
    }
}

/// `suspicious_behavior` 이벤트 본문 (`{mac, type, message, time}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    pub mac: MacAddr,
    #[serde(rename = "type")]
    pub alarm_type: AlarmType,
    pub message: String,
    pub time: String,
}
