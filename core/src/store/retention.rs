use super::{ContractStore, RetentionRate};
use crate::{
    error::{NfrError, NfrResult},
    retention::RetentionResult,
};
use rusqlite::{params, OptionalExtension};
use std::collections::BTreeMap;

impl ContractStore {
    /// Drop every stored retention row and insert `results`, in one
    /// transaction.
    pub fn replace_retention_results(&self, results: &[RetentionResult]) -> NfrResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM retention_window_flag", [])?;
        tx.execute("DELETE FROM retention_result", [])?;
        {
            let mut insert_result = tx.prepare(
                "INSERT INTO retention_result (
                     contract_id, customer_id, next_contract_id, gap_days,
                     same_dealer, brand_loyal, transition_label
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut insert_flag = tx.prepare(
                "INSERT INTO retention_window_flag (contract_id, window_label, retained)
                 VALUES (?1, ?2, ?3)",
            )?;
            for r in results {
                insert_result.execute(params![
                    r.contract_id,
                    r.customer_id,
                    r.next_contract_id,
                    r.gap_days,
                    r.same_dealer,
                    r.brand_loyal,
                    r.transition_label,
                ])?;
                for (label, retained) in &r.retained {
                    insert_flag.execute(params![r.contract_id, label, retained])?;
                }
            }
        }
        tx.commit()?;
        log::debug!("store: wrote {} retention results", results.len());
        Ok(())
    }

    pub fn retention_result(&self, contract_id: &str) -> NfrResult<Option<RetentionResult>> {
        let mut stmt = self.conn.prepare(
            "SELECT contract_id, customer_id, next_contract_id, gap_days,
                    same_dealer, brand_loyal, transition_label
             FROM retention_result WHERE contract_id = ?1",
        )?;
        let row = stmt
            .query_row(params![contract_id], |r| {
                Ok(RetentionResult {
                    contract_id:      r.get(0)?,
                    customer_id:      r.get(1)?,
                    retained:         BTreeMap::new(),
                    next_contract_id: r.get(2)?,
                    gap_days:         r.get(3)?,
                    same_dealer:      r.get(4)?,
                    brand_loyal:      r.get(5)?,
                    transition_label: r.get(6)?,
                })
            })
            .optional()?;

        let Some(mut result) = row else {
            return Ok(None);
        };
        let mut flags = self.conn.prepare(
            "SELECT window_label, retained FROM retention_window_flag WHERE contract_id = ?1",
        )?;
        result.retained = flags
            .query_map(params![contract_id], |r| Ok((r.get::<_, String>(0)?, r.get::<_, bool>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(Some(result))
    }

    pub fn retention_result_count(&self) -> NfrResult<i64> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM retention_result", [], |r| r.get(0))?)
    }

    /// Share of stored results retained under `window_label`.
    pub fn retention_rate(&self, window_label: &str) -> NfrResult<RetentionRate> {
        let ended = self.retention_result_count()?;
        let (flagged, retained): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(retained), 0)
             FROM retention_window_flag WHERE window_label = ?1",
            params![window_label],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        if ended > 0 && flagged == 0 {
            return Err(NfrError::UnknownWindow { label: window_label.to_string() });
        }
        let rate = if ended > 0 {
            retained as f64 / ended as f64 * 100.0
        } else {
            0.0
        };
        Ok(RetentionRate { ended, retained, rate })
    }
}
