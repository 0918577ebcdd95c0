//! Durable, append-only change ledger with backup and rollback.
//!
//! Every proposed change is recorded in a SQLite table; records are never
//! deleted, and only the status column ever changes (to ROLLED_BACK).
//! In-memory state is guarded by a single mutex so the quota check and the
//! applied-change log can run as one atomic step under concurrent callers.
//! Each operation opens its own connection; callers never manage
//! connection lifetime.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection};

use crate::config::AnalysisConfig;
use crate::errors::{RippleError, RippleResult};
use crate::models::{ChangeRecord, ChangeStatus, ImprovementAction, LedgerStats};

const SCHEMA_STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS changes (
        change_id TEXT PRIMARY KEY,
        action_json TEXT NOT NULL,
        status TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        files_json TEXT NOT NULL,
        backup_path TEXT,
        error_message TEXT
    );",
    "CREATE INDEX IF NOT EXISTS idx_changes_status ON changes(status);",
];

struct LedgerState {
    records: Vec<ChangeRecord>,
    session_count: usize,
}

/// Owns the change history, the session quota, and the backup directory.
pub struct ChangeLedger {
    backup_dir: PathBuf,
    ledger_path: PathBuf,
    max_per_session: usize,
    state: Mutex<LedgerState>,
}

impl ChangeLedger {
    /// Open (or create) the ledger. Existing records are loaded so history
    /// survives process restarts; the session counter always starts at 0.
    pub fn open(config: &AnalysisConfig) -> RippleResult<ChangeLedger> {
        std::fs::create_dir_all(&config.backup_dir)?;
        if let Some(parent) = config.ledger_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.ledger_path)?;
        for statement in SCHEMA_STATEMENTS {
            conn.execute_batch(statement)?;
        }
        let records = load_records(&conn)?;
        drop(conn);

        Ok(ChangeLedger {
            backup_dir: config.backup_dir.clone(),
            ledger_path: config.ledger_path.clone(),
            max_per_session: config.max_changes_per_session,
            state: Mutex::new(LedgerState {
                records,
                session_count: 0,
            }),
        })
    }

    fn connect(&self) -> RippleResult<Connection> {
        Ok(Connection::open(&self.ledger_path)?)
    }

    /// Whether another change may be applied in this session.
    pub fn can_make_change(&self) -> (bool, String) {
        let state = self.state.lock();
        if state.session_count >= self.max_per_session {
            return (
                false,
                format!(
                    "Session quota reached ({}/{})",
                    state.session_count, self.max_per_session
                ),
            );
        }
        (true, "OK".to_string())
    }

    /// Copy `file_path` into the backup directory under a timestamped name.
    ///
    /// A missing source file is an error, never a silent no-op.
    pub fn backup_file(&self, file_path: &Path) -> RippleResult<PathBuf> {
        if !file_path.exists() {
            return Err(RippleError::Ledger(format!(
                "File not found: {}",
                file_path.display()
            )));
        }
        let name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "unnamed".to_string());
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S_%3f");
        let mut backup_path = self.backup_dir.join(format!("{name}.{stamp}.backup"));
        let mut attempt = 1;
        while backup_path.exists() {
            backup_path = self
                .backup_dir
                .join(format!("{name}.{stamp}.{attempt}.backup"));
            attempt += 1;
        }
        std::fs::copy(file_path, &backup_path)?;
        Ok(backup_path)
    }

    /// Append one change record. The session counter moves only for
    /// APPLIED records: failed attempts do not consume quota.
    pub fn log_change(
        &self,
        action: &ImprovementAction,
        status: ChangeStatus,
        files_modified: Vec<String>,
        backup_path: Option<String>,
        error_message: Option<String>,
    ) -> RippleResult<String> {
        let mut state = self.state.lock();
        self.append_record(
            &mut state,
            action,
            status,
            files_modified,
            backup_path,
            error_message,
        )
    }

    /// Quota check plus APPLIED log as one atomic step.
    ///
    /// Returns `Ok(None)` when the session quota is exhausted; the record
    /// is not written in that case.
    pub fn try_apply(
        &self,
        action: &ImprovementAction,
        files_modified: Vec<String>,
        backup_path: Option<String>,
    ) -> RippleResult<Option<String>> {
        let mut state = self.state.lock();
        if state.session_count >= self.max_per_session {
            return Ok(None);
        }
        let change_id = self.append_record(
            &mut state,
            action,
            ChangeStatus::Applied,
            files_modified,
            backup_path,
            None,
        )?;
        Ok(Some(change_id))
    }

    fn append_record(
        &self,
        state: &mut LedgerState,
        action: &ImprovementAction,
        status: ChangeStatus,
        files_modified: Vec<String>,
        backup_path: Option<String>,
        error_message: Option<String>,
    ) -> RippleResult<String> {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let seed = format!(
            "{timestamp}|{}|{}",
            state.records.len(),
            action.target
        );
        let change_id = format!("{:08x}", crc32fast::hash(seed.as_bytes()));

        let record = ChangeRecord {
            change_id: change_id.clone(),
            action: action.clone(),
            status,
            timestamp,
            files_modified,
            backup_path,
            error_message,
        };

        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO changes(change_id, action_json, status, timestamp, \
             files_json, backup_path, error_message) \
             VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                record.change_id,
                serde_json::to_string(&record.action)?,
                record.status.as_str(),
                record.timestamp,
                serde_json::to_string(&record.files_modified)?,
                record.backup_path,
                record.error_message,
            ],
        )?;

        if status == ChangeStatus::Applied {
            state.session_count += 1;
        }
        state.records.push(record);
        Ok(change_id)
    }

    /// Roll back the most recent APPLIED change.
    ///
    /// Returns `false` (never raises) when there is nothing to roll back,
    /// the record has no backup path, the backup file is gone, or a
    /// restore copy fails. On success every modified file is restored from
    /// the backup, the record flips to ROLLED_BACK, and one unit of
    /// session quota is returned (floored at 0).
    pub fn rollback_last(&self) -> bool {
        let mut state = self.state.lock();

        let index = match state
            .records
            .iter()
            .rposition(|r| r.status == ChangeStatus::Applied)
        {
            Some(i) => i,
            None => {
                tracing::warn!("no applied changes to roll back");
                return false;
            }
        };

        let backup_path = match &state.records[index].backup_path {
            Some(p) => PathBuf::from(p),
            None => {
                tracing::warn!(
                    "no backup available for change {}",
                    state.records[index].change_id
                );
                return false;
            }
        };
        if !backup_path.exists() {
            tracing::warn!("backup file not found: {}", backup_path.display());
            return false;
        }

        for file in &state.records[index].files_modified {
            if let Err(e) = std::fs::copy(&backup_path, file) {
                tracing::warn!("rollback failed restoring {file}: {e}");
                return false;
            }
            tracing::info!("restored {file}");
        }

        let change_id = state.records[index].change_id.clone();
        let db_result = self.connect().and_then(|conn| {
            conn.execute(
                "UPDATE changes SET status = ?1 WHERE change_id = ?2;",
                params![ChangeStatus::RolledBack.as_str(), change_id],
            )
            .map_err(RippleError::from)
        });
        if let Err(e) = db_result {
            tracing::warn!("rollback applied on disk but ledger update failed: {e}");
        }

        state.records[index].status = ChangeStatus::RolledBack;
        state.session_count = state.session_count.saturating_sub(1);
        tracing::info!("rollback successful for change {}", state.records[index].change_id);
        true
    }

    /// Aggregate counters over the full history.
    pub fn get_statistics(&self) -> LedgerStats {
        let state = self.state.lock();
        let total = state.records.len();
        let applied = state
            .records
            .iter()
            .filter(|r| r.status == ChangeStatus::Applied)
            .count();
        let failed = state
            .records
            .iter()
            .filter(|r| r.status == ChangeStatus::Failed)
            .count();
        let rolled_back = state
            .records
            .iter()
            .filter(|r| r.status == ChangeStatus::RolledBack)
            .count();
        let success_rate = if total > 0 {
            applied as f64 / total as f64
        } else {
            0.0
        };
        LedgerStats {
            total_changes: total,
            applied,
            failed,
            rolled_back,
            success_rate,
            session_count: state.session_count,
            session_quota: self.max_per_session,
            quota_remaining: self.max_per_session.saturating_sub(state.session_count),
        }
    }

    /// Most recent records, newest first.
    pub fn get_history(&self, limit: usize) -> Vec<ChangeRecord> {
        let state = self.state.lock();
        state.records.iter().rev().take(limit).cloned().collect()
    }

    /// Reset the session counter at session start.
    pub fn reset_session(&self) {
        self.state.lock().session_count = 0;
    }
}

fn load_records(conn: &Connection) -> RippleResult<Vec<ChangeRecord>> {
    let mut stmt = conn.prepare(
        "SELECT change_id, action_json, status, timestamp, files_json, \
         backup_path, error_message FROM changes ORDER BY rowid;",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, String>(4)?,
            row.get::<_, Option<String>>(5)?,
            row.get::<_, Option<String>>(6)?,
        ))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (change_id, action_json, status, timestamp, files_json, backup_path, error_message) =
            row?;
        records.push(ChangeRecord {
            change_id,
            action: serde_json::from_str(&action_json)?,
            status: ChangeStatus::parse(&status)?,
            timestamp,
            files_modified: serde_json::from_str(&files_json)?,
            backup_path,
            error_message,
        });
    }
    Ok(records)
}
