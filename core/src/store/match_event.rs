use super::ContractStore;
use crate::{
    error::NfrResult,
    matcher::{ConfidenceTier, MatchEvent},
    types::{ContractId, CustomerId},
};
use rusqlite::params;
use std::collections::BTreeMap;

impl ContractStore {
    /// Overwrite every contract's customer_id and rebuild the match log,
    /// all in one transaction.
    pub fn replace_customer_assignments(
        &self,
        assignments: &BTreeMap<ContractId, CustomerId>,
        events: &[MatchEvent],
    ) -> NfrResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM match_event", [])?;
        tx.execute("UPDATE contract SET customer_id = NULL", [])?;
        {
            let mut assign = tx.prepare(
                "UPDATE contract SET customer_id = ?2 WHERE contract_id = ?1",
            )?;
            for (contract_id, customer_id) in assignments {
                assign.execute(params![contract_id, customer_id])?;
            }

            let mut insert = tx.prepare(
                "INSERT INTO match_event (
                     contract_id_a, contract_id_b, rule_name, confidence_tier, assigned_customer_id
                 ) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for e in events {
                insert.execute(params![
                    e.contract_id_a,
                    e.contract_id_b,
                    e.rule_name,
                    e.confidence_tier.as_str(),
                    e.assigned_customer_id,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!(
            "store: assigned {} contracts, wrote {} match events",
            assignments.len(),
            events.len()
        );
        Ok(())
    }

    /// The match log in insertion (cascade) order.
    pub fn match_events(&self) -> NfrResult<Vec<MatchEvent>> {
        let mut stmt = self.conn.prepare(
            "SELECT contract_id_a, contract_id_b, rule_name, confidence_tier, assigned_customer_id
             FROM match_event ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, String>(2)?,
                    r.get::<_, String>(3)?,
                    r.get::<_, String>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut events = Vec::with_capacity(rows.len());
        for (contract_id_a, contract_id_b, rule_name, tier, assigned_customer_id) in rows {
            let confidence_tier = ConfidenceTier::parse(&tier).ok_or_else(|| {
                anyhow::anyhow!("match_event has unknown confidence tier '{tier}'")
            })?;
            events.push(MatchEvent {
                contract_id_a,
                contract_id_b,
                rule_name,
                confidence_tier,
                assigned_customer_id,
            });
        }
        Ok(events)
    }

    pub fn match_event_counts_by_rule(&self) -> NfrResult<BTreeMap<String, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT rule_name, COUNT(*) FROM match_event GROUP BY rule_name",
        )?;
        let counts = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(counts)
    }
}
