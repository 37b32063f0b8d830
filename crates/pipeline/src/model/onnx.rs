//! ONNX Runtime 백엔드
//!
//! 입력은 [`OneHotEncoder`]로 인코딩한 `[1, width]` f32 텐서이고,
//! 첫 번째 출력을 i64 라벨 텐서로 읽습니다.

use std::path::Path;

use ndarray::Array2;
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Value;
use parking_lot::Mutex;

use lanwarden_core::error::ModelError;

use super::BehaviorModel;
use super::encoder::{EncoderSpec, OneHotEncoder};
use crate::features::FeatureVector;

/// ONNX 분류 모델
pub struct OnnxModel {
    // Session::run은 &mut self를 요구함
    session: Mutex<Session>,
    encoder: OneHotEncoder,
    output_name: String,
    path: String,
}

impl OnnxModel {
    pub fn load(model_path: &str, encoder_path: &str) -> Result<Self, ModelError> {
        let load_err = |path: &str, reason: String| ModelError::Load {
            path: path.to_owned(),
            reason,
        };

        if encoder_path.trim().is_empty() {
            return Err(load_err(
                model_path,
                "onnx models require model.encoder_path".to_owned(),
            ));
        }
        let encoder_text = std::fs::read_to_string(Path::new(encoder_path))
            .map_err(|e| load_err(encoder_path, e.to_string()))?;
        let spec: EncoderSpec = serde_json::from_str(&encoder_text)
            .map_err(|e| load_err(encoder_path, e.to_string()))?;

        let session = Session::builder()
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Level3))
            .and_then(|b| b.commit_from_file(model_path))
            .map_err(|e| load_err(model_path, e.to_string()))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| load_err(model_path, "model defines no outputs".to_owned()))?;

        Ok(Self {
            session: Mutex::new(session),
            encoder: OneHotEncoder::new(spec),
            output_name,
            path: model_path.to_owned(),
        })
    }
}

impl BehaviorModel for OnnxModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        let infer = |reason: String| ModelError::Inference(reason);

        #[allow(clippy::cast_possible_truncation)]
        let row: Vec<f32> = self
            .encoder
            .encode(features)
            .into_iter()
            .map(|v| v as f32)
            .collect();
        let width = row.len();
        let input = Array2::<f32>::from_shape_vec((1, width), row)
            .map_err(|e| infer(e.to_string()))?;
        let tensor = Value::from_array(input).map_err(|e| infer(e.to_string()))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| infer(e.to_string()))?;
        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| infer(format!("output '{}' missing", self.output_name)))?;
        let (_, labels) = output
            .try_extract_tensor::<i64>()
            .map_err(|e| infer(e.to_string()))?;

        labels
            .first()
            .copied()
            .ok_or_else(|| infer("empty label tensor".to_owned()))
    }

    fn describe(&self) -> String {
        format!(
            "onnx ({}, {} inputs, output '{}')",
            self.path,
            self.encoder.width(),
            self.output_name
        )
    }
}
