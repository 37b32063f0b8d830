//! SQLite 데이터베이스 핸들
//!
//! 쓰기 전용 연결 하나와 읽기 전용 연결 하나를 유지합니다.
//! WAL 모드에서 읽기는 쓰기를 막지 않으며, 쓰기는 writer 뮤텍스로 직렬화됩니다.
//!
//! # 스키마
//! ```text
//! trusted_devices(eth_src PK)   blocked_devices(eth_src PK)
//! packets(eth_src, eth_dst, ip_proto, port_src, port_dst, size, time,
//!         host, hostname, classification, behavior_prediction)
//! ```
//! `packets`에는 기본 키나 유일성 제약이 없습니다 (추가 전용 감사 로그).

use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rusqlite::{Connection, OpenFlags};

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS trusted_devices (
    eth_src TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS blocked_devices (
    eth_src TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS packets (
    eth_src TEXT NOT NULL,
    eth_dst TEXT NOT NULL,
    ip_proto TEXT NOT NULL,
    port_src TEXT NOT NULL,
    port_dst TEXT NOT NULL,
    size INTEGER NOT NULL,
    time TEXT NOT NULL
);
"#;

/// 이전 버전 스키마에 없던 `packets` 열
const PACKET_EXTRA_COLUMNS: [&str; 4] = ["host", "hostname", "classification", "behavior_prediction"];

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_packets_eth_src ON packets(eth_src);
CREATE INDEX IF NOT EXISTS idx_packets_time ON packets(time);
"#;

/// 신뢰 저장소와 감사 로그가 공유하는 데이터베이스
pub struct Database {
    path: Option<PathBuf>,
    busy_timeout: Duration,
    writer: Mutex<Connection>,
    reader: Option<Mutex<Connection>>,
}

impl Database {
    /// 파일 데이터베이스를 열고 스키마를 준비합니다.
    ///
    /// 상위 디렉토리가 없으면 생성합니다.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let writer = Connection::open(path)?;
        writer.busy_timeout(busy_timeout)?;
        let mode: String =
            writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        writer.pragma_update(None, "synchronous", "NORMAL")?;
        migrate(&writer)?;

        let reader = open_reader(path, busy_timeout)?;

        tracing::info!(
            path = %path.display(),
            journal_mode = %mode,
            "database opened"
        );

        Ok(Self {
            path: Some(path.to_path_buf()),
            busy_timeout,
            writer: Mutex::new(writer),
            reader: Some(Mutex::new(reader)),
        })
    }

    /// 메모리 데이터베이스를 엽니다. 모든 접근이 단일 연결을 사용합니다.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            path: None,
            busy_timeout: Duration::from_secs(5),
            writer: Mutex::new(conn),
            reader: None,
        })
    }

    /// 파일 경로 (메모리 데이터베이스면 `None`)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// writer 연결로 작업을 실행합니다.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> Result<T> {
        let mut conn = self.writer.lock();
        Ok(f(&mut conn)?)
    }

    /// 공유 reader 연결로 짧은 조회를 실행합니다.
    pub(crate) fn read<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        match &self.reader {
            Some(reader) => {
                let conn = reader.lock();
                Ok(f(&conn)?)
            }
            None => {
                let conn = self.writer.lock();
                Ok(f(&conn)?)
            }
        }
    }

    /// 긴 조회(내보내기)를 전용 연결에서 실행합니다.
    ///
    /// 공유 reader를 오래 점유하지 않으므로 캡처 중의 신뢰 상태 조회가 대기하지 않습니다.
    pub(crate) fn read_dedicated<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T>,
    ) -> Result<T> {
        match &self.path {
            Some(path) => {
                let conn = open_reader(path, self.busy_timeout)?;
                f(&conn)
            }
            None => {
                let conn = self.writer.lock();
                f(&conn)
            }
        }
    }
}

fn open_reader(path: &Path, busy_timeout: Duration) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    conn.busy_timeout(busy_timeout)?;
    Ok(conn)
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;

    let existing = column_names(conn, "packets")?;
    for column in PACKET_EXTRA_COLUMNS {
        if !existing.iter().any(|c| c.eq_ignore_ascii_case(column)) {
            tracing::info!(column, "adding missing packets column");
            conn.execute_batch(&format!(
                "ALTER TABLE packets ADD COLUMN {column} TEXT NOT NULL DEFAULT 'Unknown'"
            ))?;
        }
    }

    conn.execute_batch(INDEXES)
}

fn column_names(conn: &Connection, table: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_database_has_schema() {
        let db = Database::open_in_memory().unwrap();
        let columns = db.read(|conn| column_names(conn, "packets")).unwrap();
        for expected in ["eth_src", "time", "host", "classification", "behavior_prediction"] {
            assert!(columns.iter().any(|c| c == expected), "missing {expected}");
        }
        assert!(db.path().is_none());
    }

    #[test]
    fn legacy_packets_table_gains_new_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE packets (eth_src TEXT, eth_dst TEXT, IP_proto TEXT, \
                 port_src TEXT, port_dst TEXT, size INTEGER, time TEXT);
                 INSERT INTO packets VALUES ('aa:bb:cc:dd:ee:ff', '11:22:33:44:55:66', 'TCP', \
                 '1234', '80', 60, '2024-01-01 00:00:00');",
            )
            .unwrap();
        }

        let db = Database::open(&path, Duration::from_secs(1)).unwrap();
        let host: String = db
            .read(|conn| conn.query_row("SELECT host FROM packets", [], |r| r.get(0)))
            .unwrap();
        assert_eq!(host, "Unknown");
    }

    #[test]
    fn open_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("lanwarden.db");
        let db = Database::open(&path, Duration::from_secs(1)).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn reopening_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.db");
        drop(Database::open(&path, Duration::from_secs(1)).unwrap());
        Database::open(&path, Duration::from_secs(1)).unwrap();
    }
}
