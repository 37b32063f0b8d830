//! 결정 트리 앙상블 모델
//!
//! JSON 아티팩트 하나에 인코더, 클래스 목록, 트리 목록이 들어 있습니다.
//!
//! ```json
//! {
//!   "encoder": {"categories": [["ff:ff:ff:ff:ff:ff"], ["DNS", "TLS"], ["53", "443"]]},
//!   "classes": [0, 1],
//!   "trees": [
//!     {"nodes": [
//!       {"feature": 5, "threshold": 1000.0, "left": 1, "right": 2},
//!       {"value": [10.0, 0.0]},
//!       {"value": [1.0, 4.0]}
//!     ]}
//!   ]
//! }
//! ```
//!
//! 각 트리는 루트(0번)에서 `x[feature] <= threshold`면 왼쪽, 아니면 오른쪽으로 내려가고,
//! 잎의 `value`에서 가장 큰 항목의 클래스에 한 표를 줍니다.
//! 최다 득표 클래스(동점이면 앞쪽 클래스)가 예측 결과입니다.

use std::path::Path;

use serde::Deserialize;

use lanwarden_core::error::ModelError;

use super::BehaviorModel;
use super::encoder::{EncoderSpec, OneHotEncoder};
use crate::features::FeatureVector;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    encoder: EncoderSpec,
    classes: Vec<i64>,
    trees: Vec<Tree>,
}

/// 트리 앙상블 분류기
#[derive(Debug, Clone)]
pub struct TreeEnsembleModel {
    encoder: OneHotEncoder,
    classes: Vec<i64>,
    trees: Vec<Tree>,
}

impl TreeEnsembleModel {
    /// 아티팩트 파일을 읽고 검증합니다.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let load_err = |reason: String| ModelError::Load {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
        Self::from_json(&text).map_err(|e| match e {
            ModelError::Load { reason, .. } => load_err(reason),
            other => other,
        })
    }

    /// JSON 문자열에서 모델을 만듭니다.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let artifact: Artifact = serde_json::from_str(json).map_err(|e| ModelError::Load {
            path: "<inline>".to_owned(),
            reason: e.to_string(),
        })?;
        let model = Self {
            encoder: OneHotEncoder::new(artifact.encoder),
            classes: artifact.classes,
            trees: artifact.trees,
        };
        model.validate().map_err(|reason| ModelError::Load {
            path: "<inline>".to_owned(),
            reason,
        })?;
        Ok(model)
    }

    /// 구조 검증
    ///
    /// 자식 인덱스는 부모보다 커야 하므로 순회는 항상 종료합니다.
    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("class list is empty".to_owned());
        }
        if self.trees.is_empty() {
            return Err("ensemble has no trees".to_owned());
        }
        let width = self.encoder.width();

        for (t, tree) in self.trees.iter().enumerate() {
            if tree.nodes.is_empty() {
                return Err(format!("tree {t} has no nodes"));
            }
            for (i, node) in tree.nodes.iter().enumerate() {
                match node {
                    Node::Split {
                        feature,
                        threshold,
                        left,
                        right,
                    } => {
                        if *feature >= width {
                            return Err(format!(
                                "tree {t} node {i}: feature {feature} out of range (width {width})"
                            ));
                        }
                        if !threshold.is_finite() {
                            return Err(format!("tree {t} node {i}: threshold is not finite"));
                        }
                        for child in [*left, *right] {
                            if child <= i || child >= tree.nodes.len() {
                                return Err(format!("tree {t} node {i}: invalid child {child}"));
                            }
                        }
                    }
                    Node::Leaf { value } => {
                        if value.len() != self.classes.len() {
                            return Err(format!(
                                "tree {t} node {i}: leaf has {} votes, expected {}",
                                value.len(),
                                self.classes.len()
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn vote(tree: &Tree, x: &[f64]) -> Result<usize, ModelError> {
        let mut idx = 0;
        loop {
            match tree.nodes.get(idx) {
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x.get(*feature).copied().ok_or_else(|| {
                        ModelError::Inference(format!("feature {feature} missing"))
                    })?;
                    idx = if v <= *threshold { *left } else { *right };
                }
                Some(Node::Leaf { value }) => return Ok(argmax(value)),
                None => return Err(ModelError::Inference(format!("node {idx} missing"))),
            }
        }
    }
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

impl BehaviorModel for TreeEnsembleModel {
    fn predict(&self, features: &FeatureVector) -> Result<i64, ModelError> {
        let x = self.encoder.encode(features);
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Inference("non-finite feature value".to_owned()));
        }

        let mut votes = vec![0usize; self.classes.len()];
        for tree in &self.trees {
            let class = Self::vote(tree, &x)?;
            votes[class] += 1;
        }

        let mut winner = 0;
        for (i, count) in votes.iter().enumerate() {
            if *count > votes[winner] {
                winner = i;
            }
        }
        Ok(self.classes[winner])
    }

    fn describe(&self) -> String {
        format!(
            "tree ensemble ({} trees, {} classes, {} inputs)",
            self.trees.len(),
            self.classes.len(),
            self.encoder.width()
        )
    }
}
