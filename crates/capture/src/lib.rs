//! # lanwarden-capture
//!
//! 패킷 소스: 프레임 캡처부터 `PacketObservation` 생성까지.
//!
//! # 구성
//! - [`source`]: 프레임 공급자 (libpcap 라이브/파일, 메모리)
//! - [`decode`]: Ethernet/IP/TCP/UDP 디코딩
//! - [`dissect`]: 최상위 프로토콜 판별, DNS/HTTP/TLS 호스트 추출
//! - [`resolve`]: 출발지 IP 역방향 DNS
//! - [`stream`]: 개수 제한, 취소 가능한 관측 이터레이터
//!
//! # 사용 예시
//! ```ignore
//! use lanwarden_capture::{CaptureSettings, ObservationStream};
//! use tokio_util::sync::CancellationToken;
//!
//! let settings = CaptureSettings::default();
//! let stream = ObservationStream::new(
//!     settings.open_source()?,
//!     settings.resolver(),
//!     settings.max_packets,
//!     CancellationToken::new(),
//! );
//! for observation in stream {
//!     println!("{}", observation?);
//! }
//! ```

pub mod config;
pub mod decode;
pub mod dissect;
pub mod resolve;
pub mod source;
pub mod stream;

pub use config::CaptureSettings;
pub use decode::{DecodedFrame, Transport, decode_frame};
pub use dissect::{AppLayer, dissect};
pub use resolve::{HostResolver, NoopResolver, SystemResolver};
pub use source::{FramePoll, FrameSource, MemoryFrameSource, PcapFrameSource, RawFrame};
pub use stream::ObservationStream;
