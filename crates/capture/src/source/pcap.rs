//! libpcap 프레임 소스
//!
//! 라이브 인터페이스 캡처와 pcap 파일 재생을 같은 타입으로 다룹니다.
//! 읽기 타임아웃은 [`FramePoll::Idle`], 파일 끝은 [`FramePoll::Exhausted`]로 변환됩니다.

use std::path::Path;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use pcap::{Activated, Capture};

use lanwarden_core::error::CaptureError;

use super::{FramePoll, FrameSource, RawFrame};

/// libpcap 기반 프레임 소스
pub struct PcapFrameSource {
    capture: Capture<dyn Activated>,
    description: String,
}

impl PcapFrameSource {
    /// 네트워크 인터페이스에서 라이브 캡처를 시작합니다.
    ///
    /// # Errors
    /// - 권한 부족: `CaptureError::PermissionDenied`
    /// - 인터페이스 없음/열기 실패: `CaptureError::InterfaceUnavailable`
    /// - 필터 컴파일 실패: `CaptureError::InvalidFilter`
    pub fn open_live(
        interface: &str,
        filter: &str,
        snaplen: u32,
        promiscuous: bool,
        read_timeout_ms: u32,
    ) -> Result<Self, CaptureError> {
        let snaplen = i32::try_from(snaplen).unwrap_or(i32::MAX);
        let timeout = i32::try_from(read_timeout_ms).unwrap_or(i32::MAX);

        let capture = Capture::from_device(interface)
            .and_then(|c| c.promisc(promiscuous).snaplen(snaplen).timeout(timeout).open())
            .map_err(|e| open_error(interface, e))?;

        let mut source = Self {
            capture: capture.into(),
            description: format!("interface {interface}"),
        };
        source.apply_filter(filter)?;

        tracing::info!(
            interface,
            filter,
            snaplen,
            promiscuous,
            "live capture opened"
        );
        Ok(source)
    }

    /// 저장된 pcap 파일을 재생합니다.
    pub fn open_file(path: impl AsRef<Path>, filter: &str) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let shown = path.display().to_string();
        let capture = Capture::from_file(path).map_err(|e| open_error(&shown, e))?;

        let mut source = Self {
            capture: capture.into(),
            description: format!("file {shown}"),
        };
        source.apply_filter(filter)?;

        tracing::info!(path = %shown, filter, "capture file opened");
        Ok(source)
    }

    fn apply_filter(&mut self, filter: &str) -> Result<(), CaptureError> {
        if filter.trim().is_empty() {
            return Ok(());
        }
        self.capture
            .filter(filter, true)
            .map_err(|e| CaptureError::InvalidFilter {
                filter: filter.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl FrameSource for PcapFrameSource {
    fn poll_frame(&mut self) -> Result<FramePoll, CaptureError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                let timestamp = timeval_to_utc(header.ts.tv_sec as i64, header.ts.tv_usec as i64);
                Ok(FramePoll::Frame(RawFrame {
                    data: Bytes::copy_from_slice(packet.data),
                    wire_len: u64::from(header.len),
                    timestamp,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(FramePoll::Idle),
            Err(pcap::Error::NoMorePackets) => Ok(FramePoll::Exhausted),
            Err(e) => Err(CaptureError::Read(e.to_string())),
        }
    }

    fn describe(&self) -> String {
        self.description.clone()
    }
}

fn timeval_to_utc(secs: i64, micros: i64) -> Option<DateTime<Utc>> {
    let nanos = u32::try_from(micros.clamp(0, 999_999) * 1_000).ok()?;
    DateTime::from_timestamp(secs, nanos)
}

fn open_error(target: &str, err: pcap::Error) -> CaptureError {
    let reason = err.to_string();
    let lowered = reason.to_ascii_lowercase();
    if lowered.contains("permission") || lowered.contains("not permitted") {
        CaptureError::PermissionDenied {
            interface: target.to_owned(),
            reason,
        }
    } else {
        CaptureError::InterfaceUnavailable {
            interface: target.to_owned(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::build;

    #[test]
    fn timeval_conversion() {
        let ts = timeval_to_utc(1_704_067_200, 250_000).unwrap();
        assert_eq!(
            lanwarden_core::time::format_time(ts),
            "2024-01-01T00:00:00.250000"
        );
    }

    #[test]
    fn permission_errors_are_classified() {
        let err = open_error(
            "en0",
            pcap::Error::PcapError("en0: You don't have permission to capture".to_owned()),
        );
        assert!(matches!(err, CaptureError::PermissionDenied { .. }));

        let err = open_error("nope0", pcap::Error::PcapError("No such device".to_owned()));
        assert!(matches!(err, CaptureError::InterfaceUnavailable { .. }));
    }

    #[test]
    fn missing_capture_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let result = PcapFrameSource::open_file(dir.path().join("absent.pcap"), "ip");
        assert!(matches!(
            result,
            Err(CaptureError::InterfaceUnavailable { .. })
        ));
    }

    /// 프레임 하나를 담은 최소 pcap 파일 (LE, DLT_EN10MB)
    fn write_capture_file(path: &Path, frame: &[u8], secs: u32, micros: u32) {
        let mut out = Vec::new();
        out.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
        out.extend_from_slice(&2u16.to_le_bytes());
        out.extend_from_slice(&4u16.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&65_535u32.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());

        let len = frame.len() as u32;
        out.extend_from_slice(&secs.to_le_bytes());
        out.extend_from_slice(&micros.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(frame);
        std::fs::write(path, out).unwrap();
    }

    #[test]
    fn capture_file_replays_then_exhausts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.pcap");
        let frame = build::udp_frame(build::SRC_MAC, 5353, 53, b"hi");
        write_capture_file(&path, &frame, 1_704_067_200, 500_000);

        let mut source = PcapFrameSource::open_file(&path, "ip").unwrap();
        assert!(source.describe().contains("one.pcap"));

        match source.poll_frame().unwrap() {
            FramePoll::Frame(raw) => {
                assert_eq!(raw.data.as_ref(), frame.as_slice());
                assert_eq!(raw.wire_len, frame.len() as u64);
                assert_eq!(
                    lanwarden_core::time::format_time(raw.timestamp.unwrap()),
                    "2024-01-01T00:00:00.500000"
                );
            }
            other => panic!("expected a frame, got {other:?}"),
        }
        assert!(matches!(source.poll_frame().unwrap(), FramePoll::Exhausted));
    }
}
