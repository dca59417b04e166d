//! Identity-field normalisation for the matcher.
//!
//! Every helper returns `None` when the raw field is missing or fails its
//! format check. A `None` only removes the record from the rules that need
//! that field; it is never an error.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::contract::{non_blank, ContractRecord};

static SORT_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6}$").unwrap());
static ACCOUNT_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{6,8}$").unwrap());
static UK_POSTCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}[0-9][A-Z0-9]?[0-9][A-Z]{2}$").unwrap());

/// Normalised identity signals of one contract, computed once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityProfile {
    /// Strictly validated "sortcode|account" pair.
    pub bank_strict:      Option<String>,
    /// Trimmed but otherwise raw "sortcode|account" pair.
    pub bank_raw:         Option<String>,
    /// Uppercased sortname with collapsed whitespace.
    pub full_name:        Option<String>,
    pub surname:          Option<String>,
    /// First three characters of the second name token.
    pub firstname_prefix: Option<String>,
    pub phone:            Option<String>,
    pub postcode:         Option<String>,
}

impl IdentityProfile {
    pub fn from_record(record: &ContractRecord, placeholder_phones: &HashSet<String>) -> Self {
        let sortname = record.sortname.as_deref();
        Self {
            bank_strict: strict_bank_key(
                record.bank_sortcode.as_deref(),
                record.account_number.as_deref(),
            ),
            bank_raw: raw_bank_key(
                record.bank_sortcode.as_deref(),
                record.account_number.as_deref(),
            ),
            full_name: normalize_name(sortname),
            surname: surname(sortname),
            firstname_prefix: firstname_prefix(sortname),
            phone: normalize_phone(record.phone.as_deref(), placeholder_phones),
            postcode: normalize_postcode(record.postcode.as_deref()),
        }
    }
}

/// Strip hyphens and whitespace from a bank field.
fn compact_digits(value: &str) -> String {
    value.chars().filter(|c| *c != '-' && !c.is_whitespace()).collect()
}

/// Sort code of exactly six digits plus a 6–8 digit account number.
pub fn strict_bank_key(sortcode: Option<&str>, account: Option<&str>) -> Option<String> {
    let sortcode = compact_digits(sortcode?);
    let account = compact_digits(account?);
    if SORT_CODE.is_match(&sortcode) && ACCOUNT_NUMBER.is_match(&account) {
        Some(format!("{sortcode}|{account}"))
    } else {
        None
    }
}

/// Both bank fields present, any format.
pub fn raw_bank_key(sortcode: Option<&str>, account: Option<&str>) -> Option<String> {
    let sortcode = non_blank(sortcode)?;
    let account = non_blank(account)?;
    Some(format!("{sortcode}|{account}"))
}

/// Uppercased sortname with runs of whitespace collapsed to one space.
pub fn normalize_name(sortname: Option<&str>) -> Option<String> {
    let tokens: Vec<&str> = non_blank(sortname)?.split_whitespace().collect();
    Some(tokens.join(" ").to_uppercase())
}

/// First whitespace-delimited token of the sortname, uppercased.
pub fn surname(sortname: Option<&str>) -> Option<String> {
    non_blank(sortname)?
        .split_whitespace()
        .next()
        .map(str::to_uppercase)
}

/// First three characters of the second name token, uppercased.
/// Shorter tokens (initials) are used whole.
pub fn firstname_prefix(sortname: Option<&str>) -> Option<String> {
    let second = non_blank(sortname)?.split_whitespace().nth(1)?;
    Some(second.chars().take(3).collect::<String>().to_uppercase())
}

/// Digits only. Rejects empty, all-zero and known placeholder numbers.
pub fn normalize_phone(phone: Option<&str>, placeholders: &HashSet<String>) -> Option<String> {
    let digits: String = non_blank(phone)?.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() || digits.chars().all(|c| c == '0') || placeholders.contains(&digits) {
        return None;
    }
    Some(digits)
}

/// Uppercased postcode without spaces, if it has a valid UK shape.
pub fn normalize_postcode(postcode: Option<&str>) -> Option<String> {
    let compact: String = non_blank(postcode)?
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    UK_POSTCODE.is_match(&compact).then_some(compact)
}

/// Placeholder list in the same digits-only form `normalize_phone` compares.
pub fn placeholder_set(placeholders: &[String]) -> HashSet<String> {
    placeholders
        .iter()
        .map(|p| p.chars().filter(char::is_ascii_digit).collect())
        .collect()
}
