use super::ContractStore;
use crate::{
    contract::{parse_iso_date, ContractRecord},
    error::NfrResult,
    types::CustomerId,
};
use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use std::collections::BTreeMap;

const CONTRACT_COLUMNS: &str =
    "contract_id, customer_id, sortname, phone, postcode, bank_sortcode, account_number,
     start_date, end_date, is_open, dealer_ref, dealer_name, make, new_used";

impl ContractStore {
    // ── Ingest boundary ────────────────────────────────────────

    /// Insert or refresh contracts keyed by contract_id.
    /// New rows start unassigned and existing rows keep their customer_id;
    /// only the matcher writes that column.
    pub fn upsert_contracts(&self, contracts: &[ContractRecord]) -> NfrResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO contract (
                     contract_id, sortname, phone, postcode, bank_sortcode,
                     account_number, start_date, end_date, is_open, dealer_ref,
                     dealer_name, make, new_used
                 ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13)
                 ON CONFLICT(contract_id) DO UPDATE SET
                     sortname       = excluded.sortname,
                     phone          = excluded.phone,
                     postcode       = excluded.postcode,
                     bank_sortcode  = excluded.bank_sortcode,
                     account_number = excluded.account_number,
                     start_date     = excluded.start_date,
                     end_date       = excluded.end_date,
                     is_open        = excluded.is_open,
                     dealer_ref     = excluded.dealer_ref,
                     dealer_name    = excluded.dealer_name,
                     make           = excluded.make,
                     new_used       = excluded.new_used",
            )?;
            for c in contracts {
                stmt.execute(params![
                    c.contract_id,
                    c.sortname,
                    c.phone,
                    c.postcode,
                    c.bank_sortcode,
                    c.account_number,
                    c.start_date.map(format_date),
                    c.end_date.map(format_date),
                    c.is_open,
                    c.dealer_ref,
                    c.dealer_name,
                    c.make,
                    c.new_used,
                ])?;
            }
        }
        tx.commit()?;
        log::debug!("store: upserted {} contracts", contracts.len());
        Ok(contracts.len())
    }

    // ── Reads ──────────────────────────────────────────────────

    /// Every contract, ordered by contract_id.
    pub fn all_contracts(&self) -> NfrResult<Vec<ContractRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contract ORDER BY contract_id ASC"
        ))?;
        let contracts = stmt
            .query_map([], contract_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contracts)
    }

    pub fn get_contract(&self, contract_id: &str) -> NfrResult<Option<ContractRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CONTRACT_COLUMNS} FROM contract WHERE contract_id = ?1"
        ))?;
        let row = stmt
            .query_row(params![contract_id], contract_from_row)
            .optional()?;
        Ok(row)
    }

    pub fn contract_count(&self) -> NfrResult<i64> {
        Ok(self.conn.query_row("SELECT COUNT(*) FROM contract", [], |r| r.get(0))?)
    }

    /// Distinct customer ids currently assigned.
    pub fn customer_count(&self) -> NfrResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(DISTINCT customer_id) FROM contract WHERE customer_id IS NOT NULL",
            [],
            |r| r.get(0),
        )?)
    }

    /// customer_id → contract ids, from the stored assignments.
    pub fn customer_clusters(&self) -> NfrResult<BTreeMap<CustomerId, Vec<String>>> {
        let mut stmt = self.conn.prepare(
            "SELECT customer_id, contract_id FROM contract
             WHERE customer_id IS NOT NULL
             ORDER BY customer_id ASC, contract_id ASC",
        )?;
        let pairs = stmt
            .query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut clusters: BTreeMap<CustomerId, Vec<String>> = BTreeMap::new();
        for (customer_id, contract_id) in pairs {
            clusters.entry(customer_id).or_default().push(contract_id);
        }
        Ok(clusters)
    }
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Stored dates that are not ISO-8601 read back as missing.
fn read_date(row: &Row<'_>, idx: usize, contract_id: &str) -> rusqlite::Result<Option<NaiveDate>> {
    let raw: Option<String> = row.get(idx)?;
    Ok(raw.and_then(|value| {
        let parsed = parse_iso_date(&value);
        if parsed.is_none() && !value.trim().is_empty() {
            log::warn!("store: contract {contract_id} has unparseable date '{value}'");
        }
        parsed
    }))
}

fn contract_from_row(r: &Row<'_>) -> rusqlite::Result<ContractRecord> {
    let contract_id: String = r.get(0)?;
    Ok(ContractRecord {
        customer_id:    r.get(1)?,
        sortname:       r.get(2)?,
        phone:          r.get(3)?,
        postcode:       r.get(4)?,
        bank_sortcode:  r.get(5)?,
        account_number: r.get(6)?,
        start_date:     read_date(r, 7, &contract_id)?,
        end_date:       read_date(r, 8, &contract_id)?,
        is_open:        r.get(9)?,
        dealer_ref:     r.get(10)?,
        dealer_name:    r.get(11)?,
        make:           r.get(12)?,
        new_used:       r.get(13)?,
        contract_id,
    })
}
