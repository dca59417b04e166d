//! The contract record, the unit of work for both batch stages.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{ContractId, CustomerId};

/// One finance contract as held in the contract store.
///
/// Identity fields are free text straight from the extract; the matcher
/// does its own normalisation. Dates are day-granular.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContractRecord {
    pub contract_id:    ContractId,
    #[serde(default)]
    pub customer_id:    Option<CustomerId>,
    // Identity signals
    #[serde(default)]
    pub sortname:       Option<String>,
    #[serde(default)]
    pub phone:          Option<String>,
    #[serde(default)]
    pub postcode:       Option<String>,
    #[serde(default)]
    pub bank_sortcode:  Option<String>,
    #[serde(default)]
    pub account_number: Option<String>,
    // Retention attributes
    #[serde(default)]
    pub start_date:     Option<NaiveDate>,
    #[serde(default)]
    pub end_date:       Option<NaiveDate>,
    pub is_open:        bool,
    #[serde(default)]
    pub dealer_ref:     Option<String>,
    #[serde(default)]
    pub dealer_name:    Option<String>,
    #[serde(default)]
    pub make:           Option<String>,
    #[serde(default)]
    pub new_used:       Option<String>,
}

impl ContractRecord {
    pub fn new(contract_id: &str) -> Self {
        Self {
            contract_id: contract_id.to_string(),
            ..Self::default()
        }
    }

    pub fn is_closed(&self) -> bool {
        !self.is_open
    }
}

/// Vehicle condition decoded from the New/Used code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    New,
    Used,
}

impl Condition {
    /// Decode "N"/"U" (or the full word), case-insensitive.
    /// Anything else is unrecognised.
    pub fn from_code(code: Option<&str>) -> Option<Self> {
        match code?.trim().to_ascii_uppercase().as_str() {
            "N" | "NEW" => Some(Self::New),
            "U" | "USED" => Some(Self::Used),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::New  => "New",
            Self::Used => "Used",
        }
    }
}

/// "Used → New" style label. `None` unless both codes are recognised.
pub fn transition_label(old_code: Option<&str>, new_code: Option<&str>) -> Option<String> {
    let old = Condition::from_code(old_code)?;
    let new = Condition::from_code(new_code)?;
    Some(format!("{} \u{2192} {}", old.label(), new.label()))
}

/// Parse an ISO-8601 calendar date. Accepts a trailing time part
/// ("2023-01-31T00:00:00") since some extracts carry one.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Non-empty, trimmed text or `None`.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
