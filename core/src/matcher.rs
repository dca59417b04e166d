//! Matcher: entity resolution of contracts into customers.
//!
//! The cascade (fixed priority order, never reordered):
//!   1. Bank Account (No Name)        Very High
//!   2. Bank Account + Surname        Very High
//!   3. Name + Phone                  High
//!   4. Name + Postcode               High   (common names excluded)
//!   5. Surname + Phone + Postcode    Moderate
//!   6. Fuzzy Name + Phone/Postcode   Moderate
//!
//! Each rule buckets contracts by an exact key and unions every bucket of
//! two or more. A MatchEvent is recorded only when a union actually merges
//! two previously separate clusters, so later rules never log pairs an
//! earlier rule already linked.
//!
//! Depends on: nothing. Runs before the retention engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
    config::MatchConfig,
    contract::ContractRecord,
    disjoint_set::DisjointSet,
    error::NfrResult,
    group::group_by,
    identity::{placeholder_set, IdentityProfile},
    stage::{BatchStage, StageReport},
    store::ContractStore,
    types::{ContractId, CustomerId},
};

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceTier {
    VeryHigh,
    High,
    Moderate,
}

impl ConfidenceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Very High",
            Self::High     => "High",
            Self::Moderate => "Moderate",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Very High" => Some(Self::VeryHigh),
            "High"      => Some(Self::High),
            "Moderate"  => Some(Self::Moderate),
            _ => None,
        }
    }
}

/// A justified pairwise link produced by one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub contract_id_a:        ContractId,
    pub contract_id_b:        ContractId,
    pub rule_name:            String,
    pub confidence_tier:      ConfidenceTier,
    pub assigned_customer_id: CustomerId,
}

/// Inputs a rule may consult beyond the record's own profile.
pub struct RuleContext {
    /// Full names at or above the common-name threshold.
    pub common_names: HashSet<String>,
}

/// One step of the cascade: a name, a tier, and the keys a record
/// contributes. A record with no keys sits the rule out.
pub struct MatchRule {
    pub name: &'static str,
    pub tier: ConfidenceTier,
    pub keys: fn(&IdentityProfile, &RuleContext) -> Vec<String>,
}

pub const RULE_BANK_NO_NAME: &str = "Bank Account (No Name)";
pub const RULE_BANK_SURNAME: &str = "Bank Account + Surname";
pub const RULE_NAME_PHONE: &str = "Name + Phone";
pub const RULE_NAME_POSTCODE: &str = "Name + Postcode";
pub const RULE_SURNAME_PHONE_POSTCODE: &str = "Surname + Phone + Postcode";
pub const RULE_FUZZY_NAME: &str = "Fuzzy Name + Phone/Postcode";

/// The cascade, in priority order.
pub const MATCH_RULES: [MatchRule; 6] = [
    MatchRule { name: RULE_BANK_NO_NAME,           tier: ConfidenceTier::VeryHigh, keys: bank_no_name_keys },
    MatchRule { name: RULE_BANK_SURNAME,           tier: ConfidenceTier::VeryHigh, keys: bank_surname_keys },
    MatchRule { name: RULE_NAME_PHONE,             tier: ConfidenceTier::High,     keys: name_phone_keys },
    MatchRule { name: RULE_NAME_POSTCODE,          tier: ConfidenceTier::High,     keys: name_postcode_keys },
    MatchRule { name: RULE_SURNAME_PHONE_POSTCODE, tier: ConfidenceTier::Moderate, keys: surname_phone_postcode_keys },
    MatchRule { name: RULE_FUZZY_NAME,             tier: ConfidenceTier::Moderate, keys: fuzzy_name_keys },
];

fn bank_no_name_keys(p: &IdentityProfile, _ctx: &RuleContext) -> Vec<String> {
    p.bank_strict.iter().cloned().collect()
}

fn bank_surname_keys(p: &IdentityProfile, _ctx: &RuleContext) -> Vec<String> {
    match (&p.bank_raw, &p.surname) {
        (Some(bank), Some(surname)) => vec![format!("{bank}|{surname}")],
        _ => Vec::new(),
    }
}

fn name_phone_keys(p: &IdentityProfile, _ctx: &RuleContext) -> Vec<String> {
    match (&p.full_name, &p.phone) {
        (Some(name), Some(phone)) => vec![format!("{name}|{phone}")],
        _ => Vec::new(),
    }
}

fn name_postcode_keys(p: &IdentityProfile, ctx: &RuleContext) -> Vec<String> {
    match (&p.full_name, &p.postcode) {
        (Some(name), Some(_)) if ctx.common_names.contains(name) => Vec::new(),
        (Some(name), Some(postcode)) => vec![format!("{name}|{postcode}")],
        _ => Vec::new(),
    }
}

fn surname_phone_postcode_keys(p: &IdentityProfile, _ctx: &RuleContext) -> Vec<String> {
    match (&p.surname, &p.phone, &p.postcode) {
        (Some(surname), Some(phone), Some(postcode)) => vec![format!("{surname}|{phone}|{postcode}")],
        _ => Vec::new(),
    }
}

fn fuzzy_name_keys(p: &IdentityProfile, _ctx: &RuleContext) -> Vec<String> {
    let (Some(surname), Some(prefix)) = (&p.surname, &p.firstname_prefix) else {
        return Vec::new();
    };
    let mut keys = Vec::with_capacity(2);
    if let Some(phone) = &p.phone {
        keys.push(format!("{surname}|{prefix}|tel:{phone}"));
    }
    if let Some(postcode) = &p.postcode {
        keys.push(format!("{surname}|{prefix}|pc:{postcode}"));
    }
    keys
}

/// Outcome of one `resolve()` call.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub assignments: BTreeMap<ContractId, CustomerId>,
    pub clusters:    BTreeMap<CustomerId, Vec<ContractId>>,
    pub events:      Vec<MatchEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub contracts:                usize,
    pub customers:                usize,
    pub multi_contract_customers: usize,
    pub pairs_by_rule:            BTreeMap<String, usize>,
}

impl Resolution {
    pub fn summary(&self) -> MatchSummary {
        let mut pairs_by_rule = BTreeMap::new();
        for event in &self.events {
            *pairs_by_rule.entry(event.rule_name.clone()).or_insert(0) += 1;
        }
        MatchSummary {
            contracts: self.assignments.len(),
            customers: self.clusters.len(),
            multi_contract_customers: self.clusters.values().filter(|c| c.len() > 1).count(),
            pairs_by_rule,
        }
    }
}

// ── Resolution ───────────────────────────────────────────────────────────────

/// Cluster `contracts` into customers.
///
/// Pure and deterministic: contracts are processed in contract_id order and
/// customer ids are numbered by each cluster's smallest contract_id, so the
/// same input always yields the same ids. Repeated contract_ids are
/// collapsed to their first occurrence.
pub fn resolve(contracts: &[ContractRecord], config: &MatchConfig) -> Resolution {
    let mut ordered: Vec<&ContractRecord> = contracts.iter().collect();
    ordered.sort_by(|a, b| a.contract_id.cmp(&b.contract_id));
    let before = ordered.len();
    ordered.dedup_by(|a, b| a.contract_id == b.contract_id);
    if ordered.len() != before {
        log::warn!(
            "matcher: ignored {} repeated contract_id rows",
            before - ordered.len()
        );
    }

    let placeholders = placeholder_set(&config.placeholder_phones);
    let profiles: Vec<IdentityProfile> = ordered
        .iter()
        .map(|c| IdentityProfile::from_record(c, &placeholders))
        .collect();

    let ctx = RuleContext {
        common_names: common_names(&profiles, config.common_name_threshold),
    };

    let mut forest = DisjointSet::new(ordered.len());
    // (a, b, rule index) for every union that merged two clusters.
    let mut links: Vec<(usize, usize, usize)> = Vec::new();

    for (rule_idx, rule) in MATCH_RULES.iter().enumerate() {
        let entries = profiles
            .iter()
            .enumerate()
            .flat_map(|(idx, profile)| {
                (rule.keys)(profile, &ctx).into_iter().map(move |key| (key, idx))
            });
        let groups = group_by(entries, |entry| Some(entry.0.clone()));

        let mut candidate_groups = 0usize;
        let mut merges = 0usize;
        for members in groups.values().filter(|m| m.len() >= 2) {
            candidate_groups += 1;
            // Uniting every member with the first gives the same partition
            // and the same merge log as uniting every pair in order.
            let anchor = members[0].1;
            for &(_, other) in &members[1..] {
                if forest.union(anchor, other) {
                    links.push((anchor, other, rule_idx));
                    merges += 1;
                }
            }
        }

        log::debug!(
            "matcher: rule='{}' tier={} groups={} merges={}",
            rule.name,
            rule.tier.as_str(),
            candidate_groups,
            merges,
        );
    }

    // Number clusters in contract_id order of their first member.
    let mut root_ids: HashMap<usize, CustomerId> = HashMap::new();
    let mut resolution = Resolution::default();
    for (idx, contract) in ordered.iter().enumerate() {
        let root = forest.find(idx);
        let next_number = root_ids.len() + 1;
        let customer_id = root_ids
            .entry(root)
            .or_insert_with(|| format!("{}{next_number:06}", config.customer_id_prefix))
            .clone();
        resolution
            .clusters
            .entry(customer_id.clone())
            .or_default()
            .push(contract.contract_id.clone());
        resolution
            .assignments
            .insert(contract.contract_id.clone(), customer_id);
    }

    resolution.events = links
        .into_iter()
        .map(|(a, b, rule_idx)| {
            let rule = &MATCH_RULES[rule_idx];
            let contract_a = &ordered[a].contract_id;
            MatchEvent {
                contract_id_a: contract_a.clone(),
                contract_id_b: ordered[b].contract_id.clone(),
                rule_name: rule.name.to_string(),
                confidence_tier: rule.tier,
                assigned_customer_id: resolution.assignments[contract_a].clone(),
            }
        })
        .collect();

    resolution
}

fn common_names(profiles: &[IdentityProfile], threshold: usize) -> HashSet<String> {
    group_by(profiles.iter(), |p| p.full_name.clone())
        .into_iter()
        .filter(|(_, holders)| holders.len() >= threshold)
        .map(|(name, _)| name)
        .collect()
}

// ── Stage ────────────────────────────────────────────────────────────────────

pub struct Matcher {
    config: MatchConfig,
}

impl Matcher {
    pub fn new(config: MatchConfig) -> Self {
        Self { config }
    }
}

impl BatchStage for Matcher {
    fn name(&self) -> &'static str { "matcher" }

    fn run(&self, store: &ContractStore) -> NfrResult<StageReport> {
        let contracts = store.all_contracts()?;
        let resolution = resolve(&contracts, &self.config);
        store.replace_customer_assignments(&resolution.assignments, &resolution.events)?;

        let summary = resolution.summary();
        log::info!(
            "matcher: {} contracts -> {} customers ({} multi-contract), {} match pairs",
            summary.contracts,
            summary.customers,
            summary.multi_contract_customers,
            resolution.events.len(),
        );
        Ok(StageReport::Match(summary))
    }
}
