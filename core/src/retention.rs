//! Retention engine: next-contract search for every closed contract.
//!
//! For a closed contract ending on E, every other contract of the same
//! customer starting inside [E - lookback, E + widest forward] is a
//! candidate. Each configured window is then tested independently against
//! that candidate set, and the single candidate nearest to E supplies the
//! relationship attributes (dealer, brand, New/Used transition).
//!
//! Window bounds are exact day offsets, not calendar months.
//! Depends on: matcher (customer_id must be assigned).

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    config::RetentionConfig,
    contract::{non_blank, transition_label, ContractRecord},
    error::NfrResult,
    group::group_by,
    stage::{BatchStage, StageReport},
    store::ContractStore,
    types::{ContractId, CustomerId},
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionResult {
    pub contract_id:      ContractId,
    pub customer_id:      Option<CustomerId>,
    /// One flag per configured window label.
    pub retained:         BTreeMap<String, bool>,
    pub next_contract_id: Option<ContractId>,
    /// Next contract's start minus this contract's end, in days.
    pub gap_days:         Option<i64>,
    pub same_dealer:      Option<bool>,
    pub brand_loyal:      Option<bool>,
    pub transition_label: Option<String>,
}

impl RetentionResult {
    /// Flag for `label`; unknown labels read as not retained.
    pub fn is_retained(&self, label: &str) -> bool {
        self.retained.get(label).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RetentionOutcome {
    /// Sorted by contract_id.
    pub results:                  Vec<RetentionResult>,
    pub closed_contracts:         usize,
    pub skipped_missing_end_date: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionSummary {
    pub closed_contracts:         usize,
    pub computed:                 usize,
    pub skipped_missing_end_date: usize,
    pub with_next_contract:       usize,
    pub retained_by_window:       BTreeMap<String, usize>,
}

impl RetentionOutcome {
    pub fn summary(&self, config: &RetentionConfig) -> RetentionSummary {
        let retained_by_window = config
            .windows
            .iter()
            .map(|w| {
                let n = self.results.iter().filter(|r| r.is_retained(&w.label)).count();
                (w.label.clone(), n)
            })
            .collect();
        RetentionSummary {
            closed_contracts: self.closed_contracts,
            computed: self.results.len(),
            skipped_missing_end_date: self.skipped_missing_end_date,
            with_next_contract: self
                .results
                .iter()
                .filter(|r| r.next_contract_id.is_some())
                .count(),
            retained_by_window,
        }
    }
}

// ── Computation ──────────────────────────────────────────────────────────────

/// Compute one result per closed contract that has an end date.
///
/// Contracts without a customer_id are evaluated as if they were the only
/// contract of their customer.
pub fn compute(contracts: &[ContractRecord], config: &RetentionConfig) -> RetentionOutcome {
    let closed_contracts = contracts.iter().filter(|c| c.is_closed()).count();
    let skipped_missing_end_date = contracts
        .iter()
        .filter(|c| c.is_closed() && c.end_date.is_none())
        .count();
    if skipped_missing_end_date > 0 {
        log::warn!(
            "retention: skipped {skipped_missing_end_date} closed contracts with no end date"
        );
    }

    let by_customer = group_by(contracts.iter(), |c| c.customer_id.clone());
    let mut groups: Vec<Vec<&ContractRecord>> = by_customer.into_values().collect();
    groups.extend(
        contracts
            .iter()
            .filter(|c| c.customer_id.is_none())
            .map(|c| vec![c]),
    );

    let per_customer: Vec<Vec<RetentionResult>> = if config.parallel {
        groups
            .par_iter()
            .map(|group| evaluate_customer(group, config))
            .collect()
    } else {
        groups
            .iter()
            .map(|group| evaluate_customer(group, config))
            .collect()
    };

    let mut results: Vec<RetentionResult> = per_customer.into_iter().flatten().collect();
    results.sort_by(|a, b| a.contract_id.cmp(&b.contract_id));

    RetentionOutcome {
        results,
        closed_contracts,
        skipped_missing_end_date,
    }
}

/// Results for every closed, dated contract of one customer.
fn evaluate_customer(contracts: &[&ContractRecord], config: &RetentionConfig) -> Vec<RetentionResult> {
    contracts
        .iter()
        .filter(|c| c.is_closed())
        .filter_map(|c| {
            let end = c.end_date?;
            Some(evaluate_contract(c, end, contracts, config))
        })
        .collect()
}

/// A sibling contract starting `offset` days after the end date.
struct Candidate<'a> {
    offset:   i64,
    contract: &'a ContractRecord,
}

fn evaluate_contract(
    closed: &ContractRecord,
    end: NaiveDate,
    siblings: &[&ContractRecord],
    config: &RetentionConfig,
) -> RetentionResult {
    let lower = -config.outer_backward_days();
    let upper = config.outer_forward_days();

    let candidates: Vec<Candidate<'_>> = siblings
        .iter()
        .filter(|s| s.contract_id != closed.contract_id)
        .filter_map(|s| {
            let offset = (s.start_date? - end).num_days();
            (lower..=upper)
                .contains(&offset)
                .then_some(Candidate { offset, contract: *s })
        })
        .collect();

    let retained = config
        .windows
        .iter()
        .map(|w| {
            let hit = candidates.iter().any(|c| w.contains_offset(c.offset));
            (w.label.clone(), hit)
        })
        .collect();

    // Nearest start wins; equal distances go to the smaller contract_id.
    let next = candidates
        .iter()
        .min_by(|a, b| {
            a.offset
                .abs()
                .cmp(&b.offset.abs())
                .then_with(|| a.contract.contract_id.cmp(&b.contract.contract_id))
        });

    RetentionResult {
        contract_id: closed.contract_id.clone(),
        customer_id: closed.customer_id.clone(),
        retained,
        next_contract_id: next.map(|n| n.contract.contract_id.clone()),
        gap_days: next.map(|n| n.offset),
        same_dealer: next.and_then(|n| same_dealer(closed, n.contract)),
        brand_loyal: next.and_then(|n| brand_loyal(closed, n.contract)),
        transition_label: next.and_then(|n| {
            transition_label(closed.new_used.as_deref(), n.contract.new_used.as_deref())
        }),
    }
}

/// Dealer ref when both sides carry one, otherwise exact dealer name.
fn same_dealer(a: &ContractRecord, b: &ContractRecord) -> Option<bool> {
    if let (Some(ref_a), Some(ref_b)) =
        (non_blank(a.dealer_ref.as_deref()), non_blank(b.dealer_ref.as_deref()))
    {
        return Some(ref_a == ref_b);
    }
    let name_a = non_blank(a.dealer_name.as_deref())?;
    let name_b = non_blank(b.dealer_name.as_deref())?;
    Some(name_a == name_b)
}

fn brand_loyal(a: &ContractRecord, b: &ContractRecord) -> Option<bool> {
    let make_a = non_blank(a.make.as_deref())?;
    let make_b = non_blank(b.make.as_deref())?;
    Some(make_a.to_lowercase() == make_b.to_lowercase())
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct RetentionEngine {
    config: RetentionConfig,
}

impl RetentionEngine {
    pub fn new(config: RetentionConfig) -> Self {
        Self { config }
    }
}

impl BatchStage for RetentionEngine {
    fn name(&self) -> &'static str { "retention" }

    fn run(&self, store: &ContractStore) -> NfrResult<StageReport> {
        let contracts = store.all_contracts()?;
        let outcome = compute(&contracts, &self.config);
        store.replace_retention_results(&outcome.results)?;

        let summary = outcome.summary(&self.config);
        log::info!(
            "retention: {} results from {} closed contracts ({} with a next contract, {} skipped)",
            summary.computed,
            summary.closed_contracts,
            summary.with_next_contract,
            summary.skipped_missing_end_date,
        );
        for (label, retained) in &summary.retained_by_window {
            log::debug!("retention: window={label} retained={retained}");
        }
        Ok(StageReport::Retention(summary))
    }
}
