//! 분류 모델 입력 특성
//!
//! 관측 하나에서 목적지 주소, 프로토콜, 목적지 포트, 크기, 시각을 뽑습니다.

use serde::{Deserialize, Serialize};

use lanwarden_core::time::posix_seconds;
use lanwarden_core::types::PacketObservation;

/// 모델 입력 특성 벡터
///
/// 앞의 세 항목은 범주형, 뒤의 두 항목은 수치형입니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub dst_mac: String,
    pub protocol: String,
    pub dst_port: String,
    pub size: f64,
    pub time_numeric: f64,
}

impl FeatureVector {
    pub fn from_observation(obs: &PacketObservation) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let size = obs.size as f64;
        Self {
            dst_mac: obs.eth_dst.to_string(),
            protocol: obs.protocol.clone(),
            dst_port: obs.port_dst.clone(),
            size,
            time_numeric: time_numeric(&obs.time),
        }
    }

    /// 범주형 열 (인코더 순서와 같음)
    pub fn categorical(&self) -> [&str; 3] {
        [&self.dst_mac, &self.protocol, &self.dst_port]
    }
}

/// 캡처 시각을 POSIX 초로 변환합니다. 해석 불가면 `0.0`
pub fn time_numeric(time: &str) -> f64 {
    posix_seconds(time)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_format_and_rfc3339() {
        assert_eq!(time_numeric("1970-01-01T00:00:01.500000"), 1.5);
        assert_eq!(time_numeric("2024-01-01T00:00:00Z"), 1_704_067_200.0);
    }

    #[test]
    fn malformed_time_is_zero() {
        assert_eq!(time_numeric("not a time"), 0.0);
        assert_eq!(time_numeric(""), 0.0);
    }

    #[test]
    fn from_observation_picks_destination_fields() {
        let obs = PacketObservation {
            eth_src: "aa:aa:aa:aa:aa:aa".parse().unwrap(),
            eth_dst: "BB:BB:BB:BB:BB:BB".parse().unwrap(),
            protocol: "TLS".to_owned(),
            port_src: "50000".to_owned(),
            port_dst: "443".to_owned(),
            size: 1514,
            time: "garbage".to_owned(),
            host: "Unknown".to_owned(),
            hostname: "Unknown".to_owned(),
        };
        let fv = FeatureVector::from_observation(&obs);
        assert_eq!(fv.categorical(), ["bb:bb:bb:bb:bb:bb", "TLS", "443"]);
        assert_eq!(fv.size, 1514.0);
        assert_eq!(fv.time_numeric, 0.0);
    }
}
