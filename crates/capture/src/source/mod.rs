//! 프레임 소스 -- 원시 링크 계층 프레임 공급자
//!
//! [`FrameSource`]는 캡처 장치나 저장된 프레임 목록에서 한 번에 하나의 프레임을 꺼냅니다.
//! 호출은 블로킹이며, 캡처 세션은 블로킹 스레드에서 소스를 소비합니다.
//!
//! # 구현체
//! - [`PcapFrameSource`]: libpcap 라이브 캡처 또는 pcap 파일 재생
//! - [`MemoryFrameSource`]: 미리 준비한 프레임 재생 (테스트, 재처리)

pub mod memory;
pub mod pcap;

pub use memory::MemoryFrameSource;
pub use pcap::PcapFrameSource;

use bytes::Bytes;
use chrono::{DateTime, Utc};

use lanwarden_core::error::CaptureError;

/// 캡처된 원시 프레임
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// 캡처된 바이트 (snaplen으로 잘렸을 수 있음)
    pub data: Bytes,
    /// 회선상 원래 길이 (바이트)
    pub wire_len: u64,
    /// 캡처 타임스탬프 (알 수 없으면 `None`)
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawFrame {
    /// 타임스탬프 없이 프레임을 만듭니다. 회선 길이는 데이터 길이와 같습니다.
    pub fn new(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let wire_len = data.len() as u64;
        Self {
            data,
            wire_len,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_wire_len(mut self, wire_len: u64) -> Self {
        self.wire_len = wire_len;
        self
    }
}

/// 한 번의 폴링 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePoll {
    /// 프레임 하나
    Frame(RawFrame),
    /// 읽기 타임아웃 (다시 폴링 가능)
    Idle,
    /// 더 이상 프레임 없음
    Exhausted,
}

/// 프레임 공급자
pub trait FrameSource: Send {
    /// 다음 프레임을 기다립니다.
    ///
    /// 캡처 장치 에러는 `CaptureError`로 반환하며, 이후 호출 결과는 보장하지 않습니다.
    fn poll_frame(&mut self) -> Result<FramePoll, CaptureError>;

    /// 로그용 소스 설명 (인터페이스 이름, 파일 경로 등)
    fn describe(&self) -> String;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn poll_frame(&mut self) -> Result<FramePoll, CaptureError> {
        (**self).poll_frame()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
