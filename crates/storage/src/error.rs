//! 저장소 에러 타입
//!
//! [`StoreError`]는 SQLite 접근 중 발생하는 모든 에러를 표현합니다.
//! `From<StoreError> for LanwardenError` 변환으로 상위 레이어에서 `?` 전파가 가능합니다.

use lanwarden_core::error::{LanwardenError, StorageError, ValidationError};

/// 저장소 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// SQLite 에러 (잠금, 제약 위반, I/O 등)
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// 데이터베이스 디렉토리 생성 실패
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 조회 조건 검증 실패
    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] ValidationError),
}

impl From<StoreError> for LanwardenError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidFilter(e) => LanwardenError::Validation(e),
            StoreError::Io(e) => LanwardenError::Storage(StorageError::Connection(e.to_string())),
            StoreError::Sqlite(e) => LanwardenError::Storage(StorageError::Query(e.to_string())),
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
