//! 원-핫 특성 인코더
//!
//! 범주형 세 열을 학습 시 관측한 범주 목록으로 원-핫 인코딩하고,
//! 수치형 두 열(크기, 시각)을 뒤에 붙입니다. 모르는 범주는 모두 0입니다.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::features::FeatureVector;

/// 범주형 열 수
pub const CATEGORICAL_COLUMNS: usize = 3;

/// 수치형 열 수
pub const NUMERIC_COLUMNS: usize = 2;

/// 직렬화 형식: `{"categories": [[dst_mac...], [protocol...], [dst_port...]]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSpec {
    pub categories: [Vec<String>; CATEGORICAL_COLUMNS],
}

/// 원-핫 인코더
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    spec: EncoderSpec,
    /// 열별 범주 → 출력 위치
    index: [HashMap<String, usize>; CATEGORICAL_COLUMNS],
    width: usize,
}

impl OneHotEncoder {
    pub fn new(spec: EncoderSpec) -> Self {
        let mut offset = 0;
        let index = std::array::from_fn(|col| {
            let map: HashMap<String, usize> = spec.categories[col]
                .iter()
                .enumerate()
                .map(|(i, c)| (c.clone(), offset + i))
                .collect();
            offset += spec.categories[col].len();
            map
        });
        let width = offset + NUMERIC_COLUMNS;
        Self { spec, index, width }
    }

    /// 인코딩 결과 길이
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn spec(&self) -> &EncoderSpec {
        &self.spec
    }

    pub fn encode(&self, features: &FeatureVector) -> Vec<f64> {
        let mut out = vec![0.0; self.width];
        for (col, value) in features.categorical().iter().enumerate() {
            if let Some(&pos) = self.index[col].get(*value) {
                out[pos] = 1.0;
            }
        }
        out[self.width - 2] = features.size;
        out[self.width - 1] = features.time_numeric;
        out
    }
}
