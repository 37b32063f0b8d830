//! 설정 관리 -- lanwarden.toml 파싱 및 런타임 설정
//!
//! [`LanwardenConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LANWARDEN_CAPTURE_INTERFACE=eth0` 형식)
//! 3. 설정 파일 (`lanwarden.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), lanwarden_core::error::LanwardenError> {
//! use lanwarden_core::config::LanwardenConfig;
//!
//! let config = LanwardenConfig::load("lanwarden.toml").await?;
//! let config = LanwardenConfig::parse("[capture]\ninterface = \"eth0\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LanwardenError};

/// Lanwarden 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LanwardenConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 패킷 캡처 설정
    #[serde(default)]
    pub capture: CaptureConfig,
    /// 행위 분류 모델 설정
    #[serde(default)]
    pub model: ModelConfig,
    /// 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
    /// HTTP API 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 알림 버스 설정
    #[serde(default)]
    pub alerts: AlertConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LanwardenConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LanwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LanwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LanwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LanwardenError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LanwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            LanwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LANWARDEN_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LANWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LANWARDEN_GENERAL_LOG_FORMAT");
        override_string(&mut self.general.data_dir, "LANWARDEN_GENERAL_DATA_DIR");
        override_string(&mut self.general.pid_file, "LANWARDEN_GENERAL_PID_FILE");

        // Capture
        override_string(&mut self.capture.interface, "LANWARDEN_CAPTURE_INTERFACE");
        override_string(&mut self.capture.bpf_filter, "LANWARDEN_CAPTURE_BPF_FILTER");
        override_usize(&mut self.capture.max_packets, "LANWARDEN_CAPTURE_MAX_PACKETS");
        override_u32(&mut self.capture.snaplen, "LANWARDEN_CAPTURE_SNAPLEN");
        override_bool(&mut self.capture.promiscuous, "LANWARDEN_CAPTURE_PROMISCUOUS");
        override_u32(
            &mut self.capture.read_timeout_ms,
            "LANWARDEN_CAPTURE_READ_TIMEOUT_MS",
        );
        override_string(&mut self.capture.pcap_file, "LANWARDEN_CAPTURE_PCAP_FILE");
        override_bool(
            &mut self.capture.resolve_hostnames,
            "LANWARDEN_CAPTURE_RESOLVE_HOSTNAMES",
        );

        // Model
        override_string(&mut self.model.path, "LANWARDEN_MODEL_PATH");
        override_string(&mut self.model.format, "LANWARDEN_MODEL_FORMAT");
        override_string(&mut self.model.encoder_path, "LANWARDEN_MODEL_ENCODER_PATH");

        // Storage
        override_string(
            &mut self.storage.database_path,
            "LANWARDEN_STORAGE_DATABASE_PATH",
        );
        override_u64(
            &mut self.storage.busy_timeout_ms,
            "LANWARDEN_STORAGE_BUSY_TIMEOUT_MS",
        );

        // Server
        override_bool(&mut self.server.enabled, "LANWARDEN_SERVER_ENABLED");
        override_string(&mut self.server.listen_addr, "LANWARDEN_SERVER_LISTEN_ADDR");
        override_u16(&mut self.server.port, "LANWARDEN_SERVER_PORT");

        // Alerts
        override_usize(
            &mut self.alerts.channel_capacity,
            "LANWARDEN_ALERTS_CHANNEL_CAPACITY",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "LANWARDEN_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LANWARDEN_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LANWARDEN_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LanwardenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        // 오프라인 재생이 아니면 인터페이스가 필요
        if self.capture.pcap_file.is_empty() && self.capture.interface.trim().is_empty() {
            return Err(invalid(
                "capture.interface",
                "interface must not be empty for live capture".to_owned(),
            ));
        }

        if self.capture.max_packets == 0 {
            return Err(invalid(
                "capture.max_packets",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.capture.snaplen == 0 {
            return Err(invalid("capture.snaplen", "must be greater than 0".to_owned()));
        }

        let valid_model_formats = ["tree", "onnx"];
        if !valid_model_formats.contains(&self.model.format.as_str()) {
            return Err(invalid(
                "model.format",
                format!("must be one of: {}", valid_model_formats.join(", ")),
            ));
        }

        if self.model.path.trim().is_empty() {
            return Err(invalid("model.path", "must not be empty".to_owned()));
        }

        if self.model.format == "onnx" && self.model.encoder_path.trim().is_empty() {
            return Err(invalid(
                "model.encoder_path",
                "onnx models require a feature encoder file".to_owned(),
            ));
        }

        if self.storage.database_path.trim().is_empty() {
            return Err(invalid(
                "storage.database_path",
                "must not be empty".to_owned(),
            ));
        }

        if self.server.enabled && self.server.port == 0 {
            return Err(invalid("server.port", "must not be 0".to_owned()));
        }

        if self.alerts.channel_capacity == 0 {
            return Err(invalid(
                "alerts.channel_capacity",
                "must be greater than 0".to_owned(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must not be 0".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> LanwardenError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
    /// 데이터 디렉토리
    pub data_dir: String,
    /// PID 파일 경로 (빈 문자열이면 사용하지 않음)
    pub pid_file: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
            data_dir: "/var/lib/lanwarden".to_owned(),
            pid_file: String::new(),
        }
    }
}

/// 패킷 캡처 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// 캡처할 네트워크 인터페이스
    pub interface: String,
    /// BPF 필터 (IP 트래픽만)
    pub bpf_filter: String,
    /// 세션당 최대 수용 IP 패킷 수
    pub max_packets: usize,
    /// 스냅샷 길이 (바이트)
    pub snaplen: u32,
    /// 무차별 모드 사용 여부
    pub promiscuous: bool,
    /// pcap 읽기 타임아웃 (밀리초), 취소 확인 주기를 겸함
    pub read_timeout_ms: u32,
    /// 오프라인 재생할 pcap 파일 (빈 문자열이면 라이브 캡처)
    pub pcap_file: String,
    /// 출발지 IP의 역방향 DNS 조회 여부
    pub resolve_hostnames: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            interface: "en0".to_owned(),
            bpf_filter: "ip".to_owned(),
            max_packets: 100,
            snaplen: 65_535,
            promiscuous: true,
            read_timeout_ms: 1_000,
            pcap_file: String::new(),
            resolve_hostnames: true,
        }
    }
}

/// 행위 분류 모델 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// 모델 파일 경로
    pub path: String,
    /// 모델 형식 (tree, onnx)
    pub format: String,
    /// ONNX 모델용 특성 인코더 파일 경로
    pub encoder_path: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/lanwarden/model.json".to_owned(),
            format: "tree".to_owned(),
            encoder_path: String::new(),
        }
    }
}

/// 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite 데이터베이스 경로
    pub database_path: String,
    /// 잠금 대기 시간 (밀리초)
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "/var/lib/lanwarden/lanwarden.db".to_owned(),
            busy_timeout_ms: 5_000,
        }
    }
}

/// HTTP API 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen_addr: "127.0.0.1".to_owned(),
            port: 5000,
        }
    }
}

/// 알림 버스 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// 구독자별 버퍼 크기 (초과 시 오래된 알림부터 유실)
    pub channel_capacity: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 엔드포인트 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str, type_name: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                expected = type_name,
                "failed to parse env var, ignoring"
            ),
        }
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key, "bool");
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key, "usize");
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key, "u16");
}

fn override_u32(target: &mut u32, env_key: &str) {
    override_parsed(target, env_key, "u32");
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key, "u64");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = LanwardenConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.capture.interface, "en0");
        assert_eq!(config.capture.bpf_filter, "ip");
        assert_eq!(config.capture.max_packets, 100);
        assert_eq!(config.model.format, "tree");
        assert!(config.server.enabled);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn default_config_passes_validation() {
        LanwardenConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = LanwardenConfig::parse("").unwrap();
        assert_eq!(config.capture.interface, "en0");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let toml = r#"
[capture]
interface = "eth1"
max_packets = 25

[server]
port = 8080
"#;
        let config = LanwardenConfig::parse(toml).unwrap();
        assert_eq!(config.capture.interface, "eth1");
        assert_eq!(config.capture.max_packets, 25);
        // 지정하지 않은 필드는 기본값 유지
        assert_eq!(config.capture.bpf_filter, "ip");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.listen_addr, "127.0.0.1");
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = LanwardenConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            LanwardenError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = LanwardenConfig::default();
        config.general.log_level = "verbose".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_empty_interface_for_live_capture() {
        let mut config = LanwardenConfig::default();
        config.capture.interface = String::new();
        assert!(config.validate().unwrap_err().to_string().contains("interface"));
    }

    #[test]
    fn validate_allows_empty_interface_with_pcap_file() {
        let mut config = LanwardenConfig::default();
        config.capture.interface = String::new();
        config.capture.pcap_file = "/tmp/trace.pcap".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_max_packets() {
        let mut config = LanwardenConfig::default();
        config.capture.max_packets = 0;
        assert!(config.validate().unwrap_err().to_string().contains("max_packets"));
    }

    #[test]
    fn validate_rejects_unknown_model_format() {
        let mut config = LanwardenConfig::default();
        config.model.format = "pickle".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("model.format"));
    }

    #[test]
    fn validate_requires_encoder_for_onnx() {
        let mut config = LanwardenConfig::default();
        config.model.format = "onnx".to_owned();
        assert!(config.validate().unwrap_err().to_string().contains("encoder_path"));
        config.model.encoder_path = "/tmp/encoder.json".to_owned();
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_alert_capacity() {
        let mut config = LanwardenConfig::default();
        config.alerts.channel_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: 테스트는 고유한 키만 조작하므로 다른 테스트와 충돌하지 않습니다.
        unsafe { std::env::set_var("TEST_LANWARDEN_STR", "overridden") };
        override_string(&mut val, "TEST_LANWARDEN_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_LANWARDEN_STR") };
    }

    #[test]
    fn env_override_invalid_number_keeps_original() {
        let mut val = 100usize;
        // SAFETY: 테스트는 고유한 키만 조작하므로 다른 테스트와 충돌하지 않습니다.
        unsafe { std::env::set_var("TEST_LANWARDEN_USIZE_BAD", "lots") };
        override_usize(&mut val, "TEST_LANWARDEN_USIZE_BAD");
        assert_eq!(val, 100);
        unsafe { std::env::remove_var("TEST_LANWARDEN_USIZE_BAD") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = true;
        override_bool(&mut val, "TEST_LANWARDEN_NONEXISTENT_12345");
        assert!(val);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = LanwardenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = LanwardenConfig::parse(&toml_str).unwrap();
        assert_eq!(config.capture.interface, parsed.capture.interface);
        assert_eq!(config.storage.database_path, parsed.storage.database_path);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = LanwardenConfig::from_file("/nonexistent/path/lanwarden.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LanwardenError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
