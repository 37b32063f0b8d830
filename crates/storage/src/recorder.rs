//! 패킷 감사 로그
//!
//! [`PacketRecorder`]는 처리된 모든 패킷을 추가 전용 로그로 기록하고,
//! 주소/시간 범위 조회와 CSV 내보내기를 제공합니다.
//!
//! 저장된 `classification`은 캡처 시점의 신뢰 상태이며,
//! 내보내기는 신뢰 테이블과의 조인으로 *현재* 신뢰 상태를 계산합니다.

use std::sync::Arc;

use rusqlite::{Row, TransactionBehavior, params};
use serde::Serialize;

use lanwarden_core::error::ValidationError;
use lanwarden_core::metrics as m;
use lanwarden_core::time::normalize_time;
use lanwarden_core::types::{ClassifiedPacketRecord, MacAddr};

use crate::db::Database;
use crate::error::Result;

/// CSV 내보내기 헤더
pub const CSV_HEADER: &str = "Source MAC,Destination MAC,Protocol,Port Dst,Size,Time,Access";

const SELECT_COLUMNS: &str = "eth_src, eth_dst, ip_proto, port_src, port_dst, size, time, \
                              host, hostname, classification, behavior_prediction";

/// 감사 로그 조회 조건
///
/// 모든 조건은 선택 사항이며, 시간 경계는 포함(inclusive)입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketFilter {
    pub eth_src: Option<MacAddr>,
    /// 정규화된 하한 (`YYYY-MM-DDTHH:MM:SS.ffffff`)
    pub date_from: Option<String>,
    /// 정규화된 상한
    pub date_to: Option<String>,
}

impl PacketFilter {
    /// 요청 파라미터에서 조회 조건을 만듭니다.
    ///
    /// 빈 문자열은 조건 없음으로 취급합니다.
    /// 주소나 시간 경계를 해석할 수 없으면 `ValidationError`를 반환합니다.
    pub fn parse(
        eth_src: Option<&str>,
        date_from: Option<&str>,
        date_to: Option<&str>,
    ) -> std::result::Result<Self, ValidationError> {
        let eth_src = non_empty(eth_src).map(str::parse::<MacAddr>).transpose()?;
        let date_from = non_empty(date_from)
            .map(|v| normalize_bound("date_from", v))
            .transpose()?;
        let date_to = non_empty(date_to)
            .map(|v| normalize_bound("date_to", v))
            .transpose()?;

        Ok(Self {
            eth_src,
            date_from,
            date_to,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn normalize_bound(field: &str, value: &str) -> std::result::Result<String, ValidationError> {
    normalize_time(value).ok_or_else(|| ValidationError::InvalidTimestamp {
        field: field.to_owned(),
        value: value.to_owned(),
    })
}

/// 저장된 감사 로그 행
///
/// 이전 버전이 남긴 행도 읽을 수 있도록 문자열 그대로 보존합니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredPacket {
    pub eth_src: String,
    pub eth_dst: String,
    #[serde(rename = "IP_proto")]
    pub ip_proto: String,
    pub port_src: String,
    pub port_dst: String,
    pub size: i64,
    pub time: String,
    pub host: String,
    pub hostname: String,
    /// 캡처 시점 신뢰 상태
    pub classification: String,
    pub behavior_prediction: String,
}

impl StoredPacket {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            eth_src: row.get(0)?,
            eth_dst: row.get(1)?,
            ip_proto: row.get(2)?,
            port_src: row.get(3)?,
            port_dst: row.get(4)?,
            size: row.get(5)?,
            time: row.get(6)?,
            host: row.get(7)?,
            hostname: row.get(8)?,
            classification: row.get(9)?,
            behavior_prediction: row.get(10)?,
        })
    }
}

/// 내보내기 행 (현재 신뢰 상태 포함)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub eth_src: String,
    pub eth_dst: String,
    pub ip_proto: String,
    pub port_dst: String,
    pub size: i64,
    pub time: String,
    /// 내보내는 시점의 신뢰 상태 (`Trusted` / `Blocked` / `Unknown`)
    pub access: String,
}

impl ExportRow {
    /// CSV 한 줄로 직렬화합니다 (줄바꿈 포함).
    pub fn to_csv_line(&self) -> String {
        let size = self.size.to_string();
        let fields = [
            self.eth_src.as_str(),
            self.eth_dst.as_str(),
            self.ip_proto.as_str(),
            self.port_dst.as_str(),
            size.as_str(),
            self.time.as_str(),
            self.access.as_str(),
        ];
        let mut line = fields
            .iter()
            .map(|f| csv_escape(f))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    }
}

fn csv_escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// 패킷 감사 로그
#[derive(Clone)]
pub struct PacketRecorder {
    db: Arc<Database>,
}

impl PacketRecorder {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 레코드 하나를 기록합니다.
    ///
    /// 단일 `INSERT`이므로 행 단위로 원자적입니다.
    pub fn append(&self, record: &ClassifiedPacketRecord) -> Result<()> {
        let obs = &record.observation;
        let size = i64::try_from(obs.size).unwrap_or(i64::MAX);
        let result = self.db.write(|conn| {
            conn.prepare_cached(
                "INSERT INTO packets (eth_src, eth_dst, ip_proto, port_src, port_dst, size, time, \
                 host, hostname, classification, behavior_prediction) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?
            .execute(params![
                obs.eth_src.to_string(),
                obs.eth_dst.to_string(),
                obs.protocol,
                obs.port_src,
                obs.port_dst,
                size,
                obs.time,
                obs.host,
                obs.hostname,
                record.classification.as_str(),
                record.behavior_prediction.as_str(),
            ])
        });

        match result {
            Ok(_) => {
                metrics::counter!(m::STORAGE_RECORDS_PERSISTED_TOTAL).increment(1);
                Ok(())
            }
            Err(e) => {
                metrics::counter!(m::STORAGE_PERSIST_FAILURES_TOTAL).increment(1);
                tracing::warn!(mac = %obs.eth_src, error = %e, "failed to persist packet record");
                Err(e)
            }
        }
    }

    /// 조건에 맞는 행을 시간순으로 반환합니다.
    pub fn query(&self, filter: &PacketFilter) -> Result<Vec<StoredPacket>> {
        let mut sql = format!("SELECT {SELECT_COLUMNS} FROM packets WHERE 1 = 1");
        let mut args: Vec<String> = Vec::with_capacity(3);

        if let Some(mac) = &filter.eth_src {
            args.push(mac.to_string());
            sql.push_str(&format!(" AND eth_src = ?{}", args.len()));
        }
        if let Some(from) = &filter.date_from {
            args.push(from.clone());
            sql.push_str(&format!(" AND time >= ?{}", args.len()));
        }
        if let Some(to) = &filter.date_to {
            args.push(to.clone());
            sql.push_str(&format!(" AND time <= ?{}", args.len()));
        }
        sql.push_str(" ORDER BY time, rowid");

        let rows = self.db.read(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(args.iter()), StoredPacket::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })?;

        tracing::debug!(count = rows.len(), "audit log queried");
        Ok(rows)
    }

    /// 현재 신뢰 상태를 포함한 전체 행을 한 행씩 `sink`로 전달합니다.
    ///
    /// `sink`가 `false`를 반환하면 중단합니다. 전달된 행 수를 반환합니다.
    pub fn export_rows(&self, mut sink: impl FnMut(ExportRow) -> bool) -> Result<usize> {
        self.db.read_dedicated(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.eth_src, p.eth_dst, p.ip_proto, p.port_dst, p.size, p.time, \
                        CASE \
                          WHEN b.eth_src IS NOT NULL THEN 'Blocked' \
                          WHEN t.eth_src IS NOT NULL THEN 'Trusted' \
                          ELSE 'Unknown' \
                        END \
                 FROM packets p \
                 LEFT JOIN trusted_devices t ON t.eth_src = p.eth_src \
                 LEFT JOIN blocked_devices b ON b.eth_src = p.eth_src \
                 ORDER BY p.time, p.rowid",
            )?;
            let mut rows = stmt.query([])?;
            let mut delivered = 0usize;
            while let Some(row) = rows.next()? {
                let export = ExportRow {
                    eth_src: row.get(0)?,
                    eth_dst: row.get(1)?,
                    ip_proto: row.get(2)?,
                    port_dst: row.get(3)?,
                    size: row.get(4)?,
                    time: row.get(5)?,
                    access: row.get(6)?,
                };
                delivered += 1;
                if !sink(export) {
                    break;
                }
            }
            Ok(delivered)
        })
    }

    /// 감사 로그에 등장한 출발지 주소 목록 (정렬, 중복 제거)
    pub fn seen_devices(&self) -> Result<Vec<MacAddr>> {
        let raw: Vec<String> = self.db.read(|conn| {
            let mut stmt =
                conn.prepare_cached("SELECT DISTINCT eth_src FROM packets ORDER BY eth_src")?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(rows)
        })?;
        Ok(raw.into_iter().filter_map(|v| v.parse().ok()).collect())
    }

    /// 전체 행 수
    pub fn count(&self) -> Result<u64> {
        let n: i64 = self
            .db
            .read(|conn| conn.query_row("SELECT COUNT(*) FROM packets", [], |r| r.get(0)))?;
        Ok(n.max(0).unsigned_abs())
    }

    /// 이전 버전이 남긴 행을 정규형으로 바꿉니다.
    ///
    /// 주소는 소문자 `:` 구분으로, 시간은 `T` 구분 고정폭 형식으로 다시 씁니다.
    /// 해석할 수 없는 시간 값은 그대로 둡니다.
    pub fn normalize_existing(&self) -> Result<usize> {
        let changed = self.db.write(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut changed = 0usize;
            for column in ["eth_src", "eth_dst"] {
                changed += tx.execute(
                    &format!(
                        "UPDATE packets SET {column} = lower(replace({column}, '-', ':')) \
                         WHERE {column} <> lower(replace({column}, '-', ':'))"
                    ),
                    [],
                )?;
            }
            changed += normalize_times(&tx)?;
            tx.commit()?;
            Ok(changed)
        })?;

        if changed > 0 {
            tracing::info!(changed, "normalized legacy packet rows");
        }
        Ok(changed)
    }
}

/// 고정폭 형식이 아닌 `time` 값을 정규형으로 다시 씁니다.
///
/// 소수 초가 없는 `T` 구분 값(`2024-01-01T00:00:00`)은 정규형보다 짧아
/// 같은 초의 정규형 상한과 문자열 비교가 어긋납니다.
fn normalize_times(conn: &rusqlite::Connection) -> rusqlite::Result<usize> {
    let stale: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT DISTINCT time FROM packets \
             WHERE time IS NOT NULL AND (length(time) <> 26 OR substr(time, 11, 1) <> 'T')",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut changed = 0;
    for raw in stale {
        let Some(fixed) = normalize_time(&raw) else {
            tracing::warn!(time = %raw, "unparseable packet time left as is");
            continue;
        };
        if fixed != raw {
            changed += conn.execute(
                "UPDATE packets SET time = ?1 WHERE time = ?2",
                params![fixed, raw],
            )?;
        }
    }
    Ok(changed)
}
