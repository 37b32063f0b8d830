//! # lanwarden-storage
//!
//! 장치 신뢰 저장소와 패킷 감사 로그.
//!
//! 두 구성 요소는 하나의 SQLite 데이터베이스([`Database`])를 공유합니다.
//! - [`TrustStore`]: 주소별 신뢰 상태 조회 및 원자적 변경
//! - [`PacketRecorder`]: 추가 전용 감사 로그, 조회, CSV 내보내기
//!
//! # 사용 예시
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lanwarden_storage::{Database, PacketRecorder, TrustStore};
//!
//! let db = Arc::new(Database::open("/var/lib/lanwarden/lanwarden.db", Duration::from_secs(5))?);
//! let trust = TrustStore::new(Arc::clone(&db));
//! let recorder = PacketRecorder::new(db);
//! # Ok::<(), lanwarden_storage::StoreError>(())
//! ```

pub mod db;
pub mod error;
pub mod recorder;
pub mod trust;

pub use db::Database;
pub use error::{Result, StoreError};
pub use recorder::{CSV_HEADER, ExportRow, PacketFilter, PacketRecorder, StoredPacket};
pub use trust::{DeviceStats, TrustStore};
