//! 캡처 설정
//!
//! [`CaptureSettings`]는 core의 [`CaptureConfig`]에서 파생되며,
//! 캡처 요청마다 패킷 수를 덮어쓸 수 있습니다.
//!
//! # 사용 예시
//! ```ignore
//! use lanwarden_core::config::LanwardenConfig;
//! use lanwarden_capture::CaptureSettings;
//!
//! let core_config = LanwardenConfig::default();
//! let settings = CaptureSettings::from_core(&core_config.capture);
//! let source = settings.open_source()?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use lanwarden_core::config::CaptureConfig;
use lanwarden_core::error::CaptureError;

use crate::resolve::{HostResolver, NoopResolver, SystemResolver};
use crate::source::{FrameSource, PcapFrameSource};

/// 캡처 세션 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// 캡처 인터페이스
    pub interface: String,
    /// BPF 필터
    pub bpf_filter: String,
    /// 세션당 수용 패킷 수
    pub max_packets: usize,
    pub snaplen: u32,
    pub promiscuous: bool,
    pub read_timeout_ms: u32,
    /// 설정되면 라이브 캡처 대신 이 파일을 재생
    pub pcap_file: Option<PathBuf>,
    pub resolve_hostnames: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self::from_core(&CaptureConfig::default())
    }
}

impl CaptureSettings {
    pub fn from_core(core: &CaptureConfig) -> Self {
        let pcap_file = (!core.pcap_file.trim().is_empty()).then(|| PathBuf::from(&core.pcap_file));
        Self {
            interface: core.interface.clone(),
            bpf_filter: core.bpf_filter.clone(),
            max_packets: core.max_packets,
            snaplen: core.snaplen,
            promiscuous: core.promiscuous,
            read_timeout_ms: core.read_timeout_ms,
            pcap_file,
            resolve_hostnames: core.resolve_hostnames,
        }
    }

    /// 패킷 수를 바꾼 사본
    pub fn with_max_packets(&self, max_packets: usize) -> Self {
        Self {
            max_packets,
            ..self.clone()
        }
    }

    /// 설정에 맞는 프레임 소스를 엽니다 (파일 재생 우선).
    pub fn open_source(&self) -> Result<Box<dyn FrameSource>, CaptureError> {
        let source = match &self.pcap_file {
            Some(path) => PcapFrameSource::open_file(path, &self.bpf_filter)?,
            None => PcapFrameSource::open_live(
                &self.interface,
                &self.bpf_filter,
                self.snaplen,
                self.promiscuous,
                self.read_timeout_ms,
            )?,
        };
        Ok(Box::new(source))
    }

    /// 설정에 맞는 역방향 조회기
    pub fn resolver(&self) -> Arc<dyn HostResolver> {
        if self.resolve_hostnames {
            Arc::new(SystemResolver)
        } else {
            Arc::new(NoopResolver)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_core_defaults() {
        let settings = CaptureSettings::from_core(&CaptureConfig::default());
        assert_eq!(settings.interface, "en0");
        assert_eq!(settings.bpf_filter, "ip");
        assert_eq!(settings.max_packets, 100);
        assert!(settings.pcap_file.is_none());
    }

    #[test]
    fn pcap_file_is_optional() {
        let core = CaptureConfig {
            pcap_file: "/tmp/lab.pcap".to_owned(),
            ..CaptureConfig::default()
        };
        let settings = CaptureSettings::from_core(&core);
        assert_eq!(settings.pcap_file, Some(PathBuf::from("/tmp/lab.pcap")));
    }

    #[test]
    fn max_packets_override_keeps_rest() {
        let settings = CaptureSettings::default().with_max_packets(5);
        assert_eq!(settings.max_packets, 5);
        assert_eq!(settings.interface, "en0");
    }

    #[test]
    fn opening_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let settings = CaptureSettings {
            pcap_file: Some(dir.path().join("none.pcap")),
            ..CaptureSettings::default()
        };
        assert!(settings.open_source().is_err());
    }
}
