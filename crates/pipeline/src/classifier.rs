//! 행위 분류기 -- 모델 출력 코드를 [`BehaviorLabel`]로 변환
//!
//! 코드 0은 Normal, 1은 Suspicious, 나머지는 Unknown입니다.
//! 추론 에러는 해당 패킷만 Unknown으로 처리하고 배치를 멈추지 않습니다.

use std::sync::Arc;

use lanwarden_core::metrics as m;
use lanwarden_core::types::BehaviorLabel;

use crate::features::FeatureVector;
use crate::model::BehaviorModel;

/// 주입된 모델을 감싸는 분류기
#[derive(Clone)]
pub struct BehaviorClassifier {
    model: Arc<dyn BehaviorModel>,
}

impl BehaviorClassifier {
    pub fn new(model: Arc<dyn BehaviorModel>) -> Self {
        Self { model }
    }

    pub fn classify(&self, features: &FeatureVector) -> BehaviorLabel {
        let label = match self.model.predict(features) {
            Ok(code) => {
                let label = BehaviorLabel::from_code(code);
                if label == BehaviorLabel::Unknown {
                    tracing::debug!(code, "unrecognized model output code");
                }
                label
            }
            Err(e) => {
                metrics::counter!(m::CLASSIFIER_INFERENCE_FAILURES_TOTAL).increment(1);
                tracing::warn!(error = %e, "inference failed, labeling packet Unknown");
                BehaviorLabel::Unknown
            }
        };

        metrics::counter!(m::CLASSIFIER_PREDICTIONS_TOTAL, m::LABEL_LABEL => label.as_str())
            .increment(1);
        label
    }

    pub fn describe(&self) -> String {
        self.model.describe()
    }
}

#[cfg(test)]
mod tests {
    use lanwarden_core::error::ModelError;

    use super::*;

    struct Fixed(Result<i64, ()>);

    impl BehaviorModel for Fixed {
        fn predict(&self, _: &FeatureVector) -> Result<i64, ModelError> {
            self.0
                .map_err(|()| ModelError::Inference("boom".to_owned()))
        }

        fn describe(&self) -> String {
            "fixed".to_owned()
        }
    }

    fn features() -> FeatureVector {
        FeatureVector {
            dst_mac: "ff:ff:ff:ff:ff:ff".to_owned(),
            protocol: "DNS".to_owned(),
            dst_port: "53".to_owned(),
            size: 60.0,
            time_numeric: 0.0,
        }
    }

    fn classify(result: Result<i64, ()>) -> BehaviorLabel {
        BehaviorClassifier::new(Arc::new(Fixed(result))).classify(&features())
    }

    #[test]
    fn maps_known_codes() {
        assert_eq!(classify(Ok(0)), BehaviorLabel::Normal);
        assert_eq!(classify(Ok(1)), BehaviorLabel::Suspicious);
    }

    #[test]
    fn unrecognized_code_is_unknown() {
        assert_eq!(classify(Ok(2)), BehaviorLabel::Unknown);
        assert_eq!(classify(Ok(-1)), BehaviorLabel::Unknown);
    }

    #[test]
    fn inference_error_is_unknown() {
        assert_eq!(classify(Err(())), BehaviorLabel::Unknown);
    }
}
