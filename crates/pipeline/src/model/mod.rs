//! 행위 분류 모델
//!
//! [`BehaviorModel`]은 특성 벡터를 원시 클래스 코드로 바꾸는 경계입니다.
//! 시작 시 [`load_model`]로 한 번 로드하고 분류기에 주입합니다.
//!
//! # 백엔드
//! - `tree` (기본): [`TreeEnsembleModel`], JSON 아티팩트
//! - `onnx`: `OnnxModel`, `onnx` 기능 활성화 시

pub mod encoder;
#[cfg(feature = "onnx")]
pub mod onnx;
pub mod tree;

use std::sync::Arc;

use lanwarden_core::config::ModelConfig;
use lanwarden_core::error::ModelError;

use crate::features::FeatureVector;

pub use encoder::{EncoderSpec, OneHotEncoder};
#[cfg(feature = "onnx")]
pub use onnx::OnnxModel;
pub use tree::TreeEnsembleModel;

/// 사전 학습된 행위 분류 모델
pub trait BehaviorModel: Send + Sync {
    /// 원시 클래스 코드를 예측합니다.
    fn predict(&self, features: &FeatureVector) -> Result<i64, ModelError>;

    /// 로그용 모델 설명
    fn describe(&self) -> String;
}

/// 설정에 따라 모델을 로드합니다.
///
/// 실패는 서비스 시작 실패로 이어집니다.
pub fn load_model(config: &ModelConfig) -> Result<Arc<dyn BehaviorModel>, ModelError> {
    let model: Arc<dyn BehaviorModel> = match config.format.as_str() {
        "tree" => Arc::new(TreeEnsembleModel::from_file(&config.path)?),
        #[cfg(feature = "onnx")]
        "onnx" => Arc::new(OnnxModel::load(&config.path, &config.encoder_path)?),
        #[cfg(not(feature = "onnx"))]
        "onnx" => {
            return Err(ModelError::Load {
                path: config.path.clone(),
                reason: "onnx support not compiled in (enable the `onnx` feature)".to_owned(),
            });
        }
        other => {
            return Err(ModelError::Load {
                path: config.path.clone(),
                reason: format!("unknown model format '{other}'"),
            });
        }
    };

    tracing::info!(path = %config.path, model = %model.describe(), "behavior model loaded");
    Ok(model)
}
