//! 도메인 타입 -- 시스템 전역에서 사용되는 공통 타입
//!
//! 캡처, 분류, 저장, HTTP 계층이 공유하는 데이터 구조를 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// 값이 없거나 해석할 수 없을 때 사용하는 기본 표기
pub const UNKNOWN: &str = "Unknown";

// ─── MacAddr ─────────────────────────────────────────────────────────

/// 정규화된 하드웨어 주소
///
/// 항상 소문자, 콜론 구분(`aa:bb:cc:dd:ee:ff`)으로 표현되므로
/// 대소문자나 구분자가 신뢰 상태 조회에 영향을 주지 않습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// 6바이트 옥텟에서 주소를 생성합니다.
    pub const fn from_octets(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// 원시 옥텟을 반환합니다.
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddr {
    type Err = ValidationError;

    /// `:` 또는 `-`로 구분된 16진수 6옥텟을 대소문자 구분 없이 해석합니다.
    /// 구분자는 한 가지만 허용합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ValidationError::InvalidMac(s.to_owned());

        let separator = match trimmed.as_bytes().get(2) {
            Some(b':') => ':',
            Some(b'-') => '-',
            _ => return Err(invalid()),
        };
        let parts: Vec<&str> = trimmed.split(separator).collect();
        if parts.len() != 6 {
            return Err(invalid());
        }

        let mut octets = [0u8; 6];
        for (slot, part) in octets.iter_mut().zip(parts) {
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| invalid())?;
        }
        Ok(Self(octets))
    }
}

impl TryFrom<String> for MacAddr {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(mac: MacAddr) -> Self {
        mac.to_string()
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

// ─── TrustState ──────────────────────────────────────────────────────

/// 장치 신뢰 상태
///
/// 신뢰 목록과 차단 목록은 상호 배타적이며, 어느 쪽에도 없으면 `Unknown`입니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrustState {
    /// 신뢰 목록에 있음
    Trusted,
    /// 차단 목록에 있음
    Blocked,
    /// 어느 목록에도 없음 (기본값)
    #[default]
    Unknown,
}

impl TrustState {
    /// 저장 및 응답에 사용하는 표기 (`Trusted`, `Blocked`, `Unknown`)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trusted => "Trusted",
            Self::Blocked => "Blocked",
            Self::Unknown => UNKNOWN,
        }
    }

    /// 조회 파라미터 값(`trusted|blocked|unknown`)을 해석합니다.
    pub fn from_category(value: &str) -> Result<Self, ValidationError> {
        value.parse().map_err(|_| ValidationError::InvalidEnum {
            field: "category".to_owned(),
            value: value.to_owned(),
            expected: "trusted, blocked, unknown".to_owned(),
        })
    }
}

impl FromStr for TrustState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trusted" => Ok(Self::Trusted),
            "blocked" => Ok(Self::Blocked),
            "unknown" => Ok(Self::Unknown),
            _ => Err(()),
        }
    }
}

impl fmt::Display for TrustState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── TrustAction ─────────────────────────────────────────────────────

/// 신뢰 상태 변경 요청
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrustAction {
    /// 신뢰 목록으로 이동
    Trust,
    /// 차단 목록으로 이동
    Block,
}

impl TrustAction {
    /// 요청 본문 값(`trust|block`)을 해석합니다.
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trust" => Ok(Self::Trust),
            "block" => Ok(Self::Block),
            _ => Err(ValidationError::InvalidEnum {
                field: "action".to_owned(),
                value: value.to_owned(),
                expected: "trust, block".to_owned(),
            }),
        }
    }

    /// 변경 결과 상태
    pub fn target_state(&self) -> TrustState {
        match self {
            Self::Trust => TrustState::Trusted,
            Self::Block => TrustState::Blocked,
        }
    }

    /// 응답 메시지에 쓰는 과거형 동사
    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Trust => "trusted",
            Self::Block => "blocked",
        }
    }
}

impl fmt::Display for TrustAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trust => f.write_str("trust"),
            Self::Block => f.write_str("block"),
        }
    }
}

// ─── BehaviorLabel ───────────────────────────────────────────────────

/// 행위 분류 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorLabel {
    /// 정상 트래픽
    Normal,
    /// 의심 트래픽
    Suspicious,
    /// 모델 출력이 알려진 라벨이 아니거나 추론 실패
    Unknown,
}

impl BehaviorLabel {
    /// 모델이 반환한 클래스 코드를 라벨로 변환합니다.
    ///
    /// `0 → Normal`, `1 → Suspicious`, 그 외는 모두 `Unknown`입니다.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Normal,
            1 => Self::Suspicious,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Suspicious => "Suspicious",
            Self::Unknown => UNKNOWN,
        }
    }
}

impl FromStr for BehaviorLabel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(Self::Normal),
            "suspicious" => Ok(Self::Suspicious),
            "unknown" => Ok(Self::Unknown),
            _ => Err(()),
        }
    }
}

impl fmt::Display for BehaviorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── PacketObservation ───────────────────────────────────────────────

/// 캡처된 패킷 하나의 정규화된 관측값
///
/// 선택 필드가 없으면 `"Unknown"` 또는 `0`으로 채워집니다.
/// 직렬화 키는 외부 클라이언트가 사용하는 점 표기(`eth.src` 등)를 따릅니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketObservation {
    /// 출발지 하드웨어 주소
    #[serde(rename = "eth.src")]
    pub eth_src: MacAddr,
    /// 목적지 하드웨어 주소
    #[serde(rename = "eth.dst")]
    pub eth_dst: MacAddr,
    /// 최상위 계층 프로토콜 이름
    #[serde(rename = "IP.proto")]
    pub protocol: String,
    /// 출발지 포트 (없으면 "Unknown")
    #[serde(rename = "port.src")]
    pub port_src: String,
    /// 목적지 포트 (없으면 "Unknown")
    #[serde(rename = "port.dst")]
    pub port_dst: String,
    /// 프레임 길이 (바이트)
    pub size: u64,
    /// 캡처 시각 (저장 형식, 세션 내 단조 비감소)
    pub time: String,
    /// 애플리케이션 계층 호스트명 (DNS 질의 / HTTP Host / TLS SNI)
    pub host: String,
    /// 출발지 IP의 역방향 DNS 이름
    pub hostname: String,
}

impl fmt::Display for PacketObservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} proto={} dport={} size={}",
            self.eth_src, self.eth_dst, self.protocol, self.port_dst, self.size,
        )
    }
}

// ─── ClassifiedPacketRecord ──────────────────────────────────────────

/// 감사 로그에 추가되는 분류 완료 레코드
///
/// `classification`은 처리 시점의 신뢰 상태이며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPacketRecord {
    /// 관측값
    #[serde(flatten)]
    pub observation: PacketObservation,
    /// 처리 시점 신뢰 상태
    pub classification: TrustState,
    /// 행위 분류 결과
    pub behavior_prediction: BehaviorLabel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mac_parses_and_canonicalizes() {
        let mac: MacAddr = "AA:BB:CC:DD:EE:FF".parse().unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");

        let dashed: MacAddr = "aa-bb-cc-dd-ee-ff".parse().unwrap();
        assert_eq!(mac, dashed);
    }

    #[test]
    fn mac_case_does_not_change_identity() {
        let upper: MacAddr = "11:22:33:AA:BB:CC".parse().unwrap();
        let lower: MacAddr = "11:22:33:aa:bb:cc".parse().unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn mac_rejects_malformed_input() {
        for bad in ["", "aa:bb:cc:dd:ee", "aa:bb:cc:dd:ee:gg", "aabb.ccdd.eeff", "a:b:c:d:e:f"] {
            assert!(bad.parse::<MacAddr>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn mac_rejects_mixed_separators() {
        for bad in ["aa:bb-cc:dd:ee:ff", "aa-bb-cc-dd-ee:ff", "aa:bb:cc:dd:ee-ff"] {
            assert_eq!(
                bad.parse::<MacAddr>(),
                Err(ValidationError::InvalidMac(bad.to_owned()))
            );
        }
        assert!("AA-BB-CC-DD-EE-FF".parse::<MacAddr>().is_ok());
    }

    #[test]
    fn mac_serializes_as_string() {
        let mac = MacAddr::from_octets([0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]);
        let json = serde_json::to_string(&mac).unwrap();
        assert_eq!(json, "\"de:ad:be:ef:00:01\"");
        let back: MacAddr = serde_json::from_str("\"DE:AD:BE:EF:00:01\"").unwrap();
        assert_eq!(back, mac);
    }

    #[test]
    fn behavior_label_maps_known_codes_only() {
        assert_eq!(BehaviorLabel::from_code(0), BehaviorLabel::Normal);
        assert_eq!(BehaviorLabel::from_code(1), BehaviorLabel::Suspicious);
        assert_eq!(BehaviorLabel::from_code(2), BehaviorLabel::Unknown);
        assert_eq!(BehaviorLabel::from_code(-1), BehaviorLabel::Unknown);
    }

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!(TrustState::from_category("Trusted").unwrap(), TrustState::Trusted);
        assert_eq!(TrustState::from_category("unknown").unwrap(), TrustState::Unknown);
        assert!(TrustState::from_category("friends").is_err());
    }

    #[test]
    fn trust_action_rejects_unknown_values() {
        assert_eq!(TrustAction::parse("trust").unwrap(), TrustAction::Trust);
        assert_eq!(TrustAction::parse("BLOCK").unwrap(), TrustAction::Block);
        assert!(matches!(
            TrustAction::parse("allow"),
            Err(ValidationError::InvalidEnum { .. })
        ));
    }

    #[test]
    fn record_serializes_with_dotted_keys() {
        let record = ClassifiedPacketRecord {
            observation: PacketObservation {
                eth_src: "aa:bb:cc:dd:ee:ff".parse().unwrap(),
                eth_dst: "11:22:33:44:55:66".parse().unwrap(),
                protocol: "DNS".to_owned(),
                port_src: "5353".to_owned(),
                port_dst: "53".to_owned(),
                size: 74,
                time: "2024-01-01T00:00:00.000000".to_owned(),
                host: "example.com".to_owned(),
                hostname: UNKNOWN.to_owned(),
            },
            classification: TrustState::Unknown,
            behavior_prediction: BehaviorLabel::Normal,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["eth.src"], "aa:bb:cc:dd:ee:ff");
        assert_eq!(value["IP.proto"], "DNS");
        assert_eq!(value["port.dst"], "53");
        assert_eq!(value["classification"], "Unknown");
        assert_eq!(value["behavior_prediction"], "Normal");
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn display_then_parse_is_identity(octets in any::<[u8; 6]>()) {
                let mac = MacAddr::from_octets(octets);
                prop_assert_eq!(mac.to_string().parse::<MacAddr>().unwrap(), mac);
            }

            #[test]
            fn case_and_separator_do_not_matter(octets in any::<[u8; 6]>()) {
                let canonical = MacAddr::from_octets(octets);
                let dashed = canonical.to_string().to_uppercase().replace(':', "-");
                prop_assert_eq!(dashed.parse::<MacAddr>().unwrap(), canonical);
            }

            #[test]
            fn arbitrary_text_does_not_panic(text in ".{0,40}") {
                let _ = text.parse::<MacAddr>();
            }
        }
    }
}
