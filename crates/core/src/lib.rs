//! # lanwarden-core
//!
//! Lanwarden 공통 크레이트 -- 도메인 타입, 이벤트, 에러, 설정, 생명주기 trait.
//!
//! 캡처, 저장소, 분류 파이프라인, 데몬이 모두 이 크레이트의 타입으로 데이터를 주고받습니다.

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod time;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{
    CaptureError, ConfigError, LanwardenError, ModelError, PipelineError, StorageError,
    ValidationError,
};

// 설정
pub use config::LanwardenConfig;

// 이벤트
pub use event::{AlarmType, AlertEvent, AlertPayload, Event, EventMetadata};

// 파이프라인 trait
pub use pipeline::{DynPipeline, HealthStatus, ModuleRegistry, Pipeline};

// 도메인 타입
pub use types::{
    BehaviorLabel, ClassifiedPacketRecord, MacAddr, PacketObservation, TrustAction, TrustState,
    UNKNOWN,
};
