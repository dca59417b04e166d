//! SQLite persistence layer for the shared contract store.
//!
//! RULE: Only the store talks to the database.
//! Stages call store methods and never execute SQL directly.
//! Every write-back a stage performs is one transaction: delete the
//! derived rows, insert the new set, commit. A failure rolls back and
//! leaves the previous results untouched.

use crate::error::NfrResult;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

mod audit;
mod contract;
mod match_event;
mod retention;

pub struct ContractStore {
    conn: Connection,
}

impl ContractStore {
    /// Open (or create) the contract database at `path`.
    pub fn open(path: &str) -> NfrResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (:memory: ignores it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> NfrResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order. Safe to call repeatedly.
    pub fn migrate(&self) -> NfrResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_contracts.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/002_match_events.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/003_retention.sql"))?;
        self.conn
            .execute_batch(include_str!("../../migrations/004_pipeline_run.sql"))?;
        Ok(())
    }
}

// ── Row types ────────────────────────────────────────────────────────

/// One pipeline execution as recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRunRow {
    pub run_id:      String,
    /// "completed" | "failed"
    pub status:      String,
    pub started_at:  String,
    pub finished_at: String,
    pub version:     String,
    pub error:       Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageLogRow {
    pub run_id:  String,
    pub stage:   String,
    pub payload: String,
}

/// NFR for one window over all stored retention results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetentionRate {
    pub ended:    i64,
    pub retained: i64,
    /// Percentage, 0.0 when nothing has ended.
    pub rate:     f64,
}
