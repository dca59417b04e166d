use super::{ContractStore, PipelineRunRow, StageLogRow};
use crate::error::NfrResult;
use rusqlite::params;

impl ContractStore {
    // ── Pipeline audit trail ───────────────────────────────────

    pub fn insert_pipeline_run(&self, row: &PipelineRunRow) -> NfrResult<()> {
        self.conn.execute(
            "INSERT INTO pipeline_run (run_id, status, started_at, finished_at, version, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                row.run_id,
                row.status,
                row.started_at,
                row.finished_at,
                row.version,
                row.error,
            ],
        )?;
        Ok(())
    }

    pub fn append_stage_log(&self, run_id: &str, stage: &str, payload: &str) -> NfrResult<()> {
        self.conn.execute(
            "INSERT INTO pipeline_stage_log (run_id, stage, payload) VALUES (?1, ?2, ?3)",
            params![run_id, stage, payload],
        )?;
        Ok(())
    }

    /// Every recorded run, oldest first.
    pub fn pipeline_runs(&self) -> NfrResult<Vec<PipelineRunRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, status, started_at, finished_at, version, error
             FROM pipeline_run ORDER BY started_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok(PipelineRunRow {
                    run_id:      r.get(0)?,
                    status:      r.get(1)?,
                    started_at:  r.get(2)?,
                    finished_at: r.get(3)?,
                    version:     r.get(4)?,
                    error:       r.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn stage_logs_for_run(&self, run_id: &str) -> NfrResult<Vec<StageLogRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT run_id, stage, payload FROM pipeline_stage_log
             WHERE run_id = ?1 ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![run_id], |r| {
                Ok(StageLogRow {
                    run_id:  r.get(0)?,
                    stage:   r.get(1)?,
                    payload: r.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}
