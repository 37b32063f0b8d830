//! # lanwarden-pipeline
//!
//! 캡처된 관측값을 분류하고 기록하고 알리는 처리 파이프라인.
//!
//! # 구성
//! - [`features`]: 모델 입력 특성 추출
//! - [`model`]: 분류 모델 경계와 백엔드 (트리 앙상블, ONNX)
//! - [`classifier`]: 모델 코드 → 행위 라벨
//! - [`alert`]: 의심 행위 알림 브로드캐스트
//! - [`service`]: 캡처 세션 실행기
//!
//! # 사용 예시
//! ```ignore
//! use lanwarden_pipeline::{AlertBus, BehaviorClassifier, CaptureRequest, CaptureService, load_model};
//!
//! let classifier = BehaviorClassifier::new(load_model(&config.model)?);
//! let service = CaptureService::builder()
//!     .trust_store(trust)
//!     .recorder(recorder)
//!     .classifier(classifier)
//!     .alert_bus(AlertBus::new(config.alerts.channel_capacity))
//!     .settings(CaptureSettings::from_core(&config.capture))
//!     .build()?;
//!
//! let report = service.run(CaptureRequest::default()).await;
//! ```

pub mod alert;
pub mod classifier;
pub mod features;
pub mod model;
pub mod service;

pub use alert::AlertBus;
pub use classifier::BehaviorClassifier;
pub use features::{FeatureVector, time_numeric};
pub use model::{BehaviorModel, TreeEnsembleModel, load_model};
pub use service::{
    CaptureRequest, CaptureService, CaptureServiceBuilder, PacketFailure, SessionReport,
    SourceFactory,
};
