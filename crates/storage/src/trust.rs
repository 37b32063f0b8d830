//! 장치 신뢰 저장소
//!
//! [`TrustStore`]는 하드웨어 주소별 신뢰 상태(Trusted / Blocked / Unknown)를 관리합니다.
//!
//! # 불변 조건
//! 한 주소는 신뢰 목록과 차단 목록에 동시에 존재하지 않습니다.
//! 상태 전환은 "반대 목록에서 삭제 → 대상 목록에 삽입(무시)"을 하나의 IMMEDIATE
//! 트랜잭션으로 실행하며, writer 연결이 뮤텍스로 직렬화되므로
//! 동시 변경이 섞여 두 목록 모두에 남거나 한쪽만 적용되는 일이 없습니다.

use std::sync::Arc;

use rusqlite::{OptionalExtension, TransactionBehavior, params};
use serde::Serialize;

use lanwarden_core::metrics as m;
use lanwarden_core::types::{MacAddr, TrustAction, TrustState};

use crate::db::Database;
use crate::error::Result;

/// 범주별 장치 수
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceStats {
    pub trusted: u64,
    pub blocked: u64,
    pub unknown: u64,
}

/// 신뢰 상태 저장소
///
/// 복제 비용이 낮으며 여러 태스크가 같은 데이터베이스를 공유합니다.
#[derive(Clone)]
pub struct TrustStore {
    db: Arc<Database>,
}

impl TrustStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// 주소의 현재 신뢰 상태를 조회합니다. 어느 목록에도 없으면 `Unknown`입니다.
    pub fn classify(&self, mac: &MacAddr) -> Result<TrustState> {
        let key = mac.to_string();
        let (trusted, blocked): (bool, bool) = self.db.read(|conn| {
            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM trusted_devices WHERE eth_src = ?1), \
                        EXISTS(SELECT 1 FROM blocked_devices WHERE eth_src = ?1)",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })?;

        Ok(match (trusted, blocked) {
            (false, false) => TrustState::Unknown,
            (true, false) => TrustState::Trusted,
            (false, true) => TrustState::Blocked,
            (true, true) => {
                // 외부에서 직접 수정된 데이터베이스; 차단을 우선합니다
                tracing::warn!(mac = %mac, "address present in both trust lists");
                TrustState::Blocked
            }
        })
    }

    /// 주소를 신뢰 목록으로 옮깁니다. 이미 신뢰 상태면 변화가 없습니다.
    pub fn trust(&self, mac: &MacAddr) -> Result<()> {
        self.apply(mac, TrustAction::Trust)
    }

    /// 주소를 차단 목록으로 옮깁니다. 이미 차단 상태면 변화가 없습니다.
    pub fn block(&self, mac: &MacAddr) -> Result<()> {
        self.apply(mac, TrustAction::Block)
    }

    /// 신뢰 상태 변경을 원자적으로 적용합니다.
    pub fn apply(&self, mac: &MacAddr, action: TrustAction) -> Result<()> {
        let key = mac.to_string();
        let (remove_from, insert_into) = match action {
            TrustAction::Trust => ("blocked_devices", "trusted_devices"),
            TrustAction::Block => ("trusted_devices", "blocked_devices"),
        };

        self.db.write(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                &format!("DELETE FROM {remove_from} WHERE eth_src = ?1"),
                params![key],
            )?;
            tx.execute(
                &format!("INSERT OR IGNORE INTO {insert_into} (eth_src) VALUES (?1)"),
                params![key],
            )?;
            tx.commit()
        })?;

        metrics::counter!(m::STORAGE_TRUST_MUTATIONS_TOTAL, m::LABEL_ACTION => action.to_string())
            .increment(1);
        tracing::info!(mac = %mac, action = %action, "trust state updated");
        Ok(())
    }

    /// 범주에 속한 주소 목록을 정렬하여 반환합니다.
    ///
    /// `Unknown`은 감사 로그에 등장한 출발지 주소 중 어느 목록에도 없는 주소입니다.
    pub fn list(&self, state: TrustState) -> Result<Vec<MacAddr>> {
        let sql = match state {
            TrustState::Trusted => "SELECT eth_src FROM trusted_devices ORDER BY eth_src",
            TrustState::Blocked => "SELECT eth_src FROM blocked_devices ORDER BY eth_src",
            TrustState::Unknown => {
                "SELECT DISTINCT eth_src FROM packets \
                 WHERE eth_src NOT IN (SELECT eth_src FROM trusted_devices) \
                   AND eth_src NOT IN (SELECT eth_src FROM blocked_devices) \
                 ORDER BY eth_src"
            }
        };

        let raw: Vec<String> = self.db.read(|conn| {
            let mut stmt = conn.prepare_cached(sql)?;
            let rows = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(rows)
        })?;

        Ok(parse_addresses(raw))
    }

    /// 범주별 장치 수를 반환합니다.
    pub fn stats(&self) -> Result<DeviceStats> {
        let (trusted, blocked, unknown): (i64, i64, i64) = self.db.read(|conn| {
            conn.query_row(
                "SELECT \
                   (SELECT COUNT(*) FROM trusted_devices), \
                   (SELECT COUNT(*) FROM blocked_devices), \
                   (SELECT COUNT(DISTINCT eth_src) FROM packets \
                      WHERE eth_src NOT IN (SELECT eth_src FROM trusted_devices) \
                        AND eth_src NOT IN (SELECT eth_src FROM blocked_devices))",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
        })?;

        Ok(DeviceStats {
            trusted: trusted.max(0).unsigned_abs(),
            blocked: blocked.max(0).unsigned_abs(),
            unknown: unknown.max(0).unsigned_abs(),
        })
    }

    /// 이전 버전이 남긴 비정규 주소를 정규형으로 바꿉니다.
    ///
    /// 대문자나 `-` 구분자를 가진 행을 정규형으로 다시 쓰고,
    /// 두 목록에 모두 있는 주소는 신뢰 목록에서 제거합니다(차단 우선).
    /// 해석할 수 없는 행은 그대로 두고 경고만 남깁니다. 변경된 행 수를 반환합니다.
    pub fn normalize_existing(&self) -> Result<usize> {
        let changed = self.db.write(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut changed = 0usize;

            for table in ["trusted_devices", "blocked_devices"] {
                let rows: Vec<String> = {
                    let mut stmt = tx.prepare(&format!("SELECT eth_src FROM {table}"))?;
                    let rows = stmt
                        .query_map([], |row| row.get(0))?
                        .collect::<rusqlite::Result<Vec<String>>>()?;
                    rows
                };

                for raw in rows {
                    let Ok(mac) = raw.parse::<MacAddr>() else {
                        tracing::warn!(table, value = %raw, "unparsable address left untouched");
                        continue;
                    };
                    let canonical = mac.to_string();
                    if canonical != raw {
                        tx.execute(
                            &format!("DELETE FROM {table} WHERE eth_src = ?1"),
                            params![raw],
                        )?;
                        tx.execute(
                            &format!("INSERT OR IGNORE INTO {table} (eth_src) VALUES (?1)"),
                            params![canonical],
                        )?;
                        changed += 1;
                    }
                }
            }

            changed += tx.execute(
                "DELETE FROM trusted_devices WHERE eth_src IN (SELECT eth_src FROM blocked_devices)",
                [],
            )?;

            tx.commit()?;
            Ok(changed)
        })?;

        if changed > 0 {
            tracing::info!(changed, "normalized legacy trust entries");
        }
        Ok(changed)
    }

    /// 주소가 감사 로그에 한 번이라도 등장했는지 확인합니다.
    pub fn has_been_seen(&self, mac: &MacAddr) -> Result<bool> {
        let key = mac.to_string();
        let found = self.db.read(|conn| {
            conn.query_row(
                "SELECT 1 FROM packets WHERE eth_src = ?1 LIMIT 1",
                params![key],
                |_| Ok(()),
            )
            .optional()
        })?;
        Ok(found.is_some())
    }
}

fn parse_addresses(raw: Vec<String>) -> Vec<MacAddr> {
    raw.into_iter()
        .filter_map(|value| match value.parse::<MacAddr>() {
            Ok(mac) => Some(mac),
            Err(_) => {
                tracing::warn!(value = %value, "skipping unparsable stored address");
                None
            }
        })
        .collect()
}
