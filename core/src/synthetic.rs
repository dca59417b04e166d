//! Synthetic contract ledger for load runs and tests.
//!
//! Each customer gets 1–4 consecutive contracts. Identity fields carry the
//! kind of noise real extracts have: hyphenated or missing bank details,
//! placeholder phones, lower-cased names, spaced or unspaced postcodes.
//! Successor contracts start anywhere from four months before to thirteen
//! months after the previous one ends, so every retention window sees hits
//! and misses.

use chrono::{Duration, NaiveDate};

use crate::{
    contract::ContractRecord,
    name_generator::NameGenerator,
    rng::{LedgerRng, LedgerStream},
};

/// Contracts ending after this date are still open.
const AS_OF: (i32, u32, u32) = (2024, 6, 30);

struct SyntheticCustomer {
    sortname: String,
    phone:    Option<String>,
    postcode: String,
    bank:     Option<(String, String)>,
}

/// Generate a deterministic ledger for `customers` customers.
pub fn generate_ledger(seed: u64, customers: usize) -> Vec<ContractRecord> {
    let mut people = LedgerRng::new(seed, LedgerStream::Customers);
    let mut deals = LedgerRng::new(seed, LedgerStream::Contracts);
    let mut noise = LedgerRng::new(seed, LedgerStream::Noise);

    let as_of = NaiveDate::from_ymd_opt(AS_OF.0, AS_OF.1, AS_OF.2).unwrap_or_default();
    let first_start = NaiveDate::from_ymd_opt(2016, 1, 1).unwrap_or_default();

    let mut contracts = Vec::new();
    for _ in 0..customers {
        let customer = generate_customer(&mut people);
        let contract_count = 1 + people.next_u64_below(4) as usize;

        let mut start = first_start + Duration::days(deals.range_i64(0, 5 * 365));
        let mut dealer = NameGenerator::generate_dealer(&mut deals);
        let mut make = NameGenerator::generate_make(&mut deals);

        for n in 0..contract_count {
            if start > as_of {
                break;
            }
            if n > 0 && !deals.chance(0.5) {
                dealer = NameGenerator::generate_dealer(&mut deals);
            }
            if n > 0 && !deals.chance(0.6) {
                make = NameGenerator::generate_make(&mut deals);
            }

            let term_days = deals.range_i64(24, 48) * 30;
            let end = start + Duration::days(term_days);
            let is_open = end > as_of;

            let contract_id = format!("AGR{:07}", noise.next_u64_below(10_000_000));
            let mut record = noisy_identity(&customer, &contract_id, &mut noise);
            record.start_date = Some(start);
            record.end_date = if !is_open && noise.chance(0.01) { None } else { Some(end) };
            record.is_open = is_open;
            record.dealer_ref = Some(dealer.0.clone());
            record.dealer_name = Some(dealer.1.to_string());
            record.make = Some(make.to_string());
            record.new_used = match deals.next_u64_below(20) {
                0 => None,
                1 => Some("X".into()),
                k if k < 12 => Some("U".into()),
                _ => Some("N".into()),
            };
            contracts.push(record);

            start = end + Duration::days(deals.range_i64(-120, 400));
        }
    }

    // Random ids can collide; keep the first.
    contracts.sort_by(|a, b| a.contract_id.cmp(&b.contract_id));
    contracts.dedup_by(|a, b| a.contract_id == b.contract_id);
    log::debug!(
        "synthetic: generated {} contracts for {customers} customers (seed {seed})",
        contracts.len()
    );
    contracts
}

fn generate_customer(rng: &mut LedgerRng) -> SyntheticCustomer {
    let sortname = NameGenerator::generate_sortname(rng);
    let phone = if rng.chance(0.85) {
        Some(format!("07{}", rng.digits(9)))
    } else {
        None
    };
    let postcode = NameGenerator::generate_postcode(rng);
    let bank = if rng.chance(0.7) {
        Some((rng.digits(6), rng.digits(8)))
    } else {
        None
    };
    SyntheticCustomer { sortname, phone, postcode, bank }
}

/// The customer's identity as one extract row might record it.
fn noisy_identity(customer: &SyntheticCustomer, contract_id: &str, rng: &mut LedgerRng) -> ContractRecord {
    let mut record = ContractRecord::new(contract_id);

    record.sortname = Some(if rng.chance(0.1) {
        customer.sortname.to_lowercase()
    } else {
        customer.sortname.clone()
    });

    record.phone = match &customer.phone {
        _ if rng.chance(0.05) => Some("00000 000000".into()),
        Some(phone) if rng.chance(0.2) => Some(format!("{} {}", &phone[..5], &phone[5..])),
        other => other.clone(),
    };

    record.postcode = Some(if rng.chance(0.3) {
        customer.postcode.replace(' ', "")
    } else {
        customer.postcode.clone()
    });

    if let Some((sortcode, account)) = &customer.bank {
        if !rng.chance(0.15) {
            record.bank_sortcode = Some(if rng.chance(0.4) {
                format!("{}-{}-{}", &sortcode[..2], &sortcode[2..4], &sortcode[4..])
            } else {
                sortcode.clone()
            });
            record.account_number = Some(account.clone());
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_identical_ledgers() {
        assert_eq!(generate_ledger(42, 50), generate_ledger(42, 50));
    }

    #[test]
    fn different_seeds_produce_different_ledgers() {
        assert_ne!(generate_ledger(42, 50), generate_ledger(43, 50));
    }

    #[test]
    fn ledger_is_keyed_by_unique_contract_id() {
        let ledger = generate_ledger(7, 200);
        assert!(!ledger.is_empty());
        assert!(ledger.windows(2).all(|w| w[0].contract_id < w[1].contract_id));
        assert!(ledger.iter().all(|c| c.customer_id.is_none()));
    }

    #[test]
    fn open_contracts_end_after_the_as_of_date() {
        let as_of = NaiveDate::from_ymd_opt(AS_OF.0, AS_OF.1, AS_OF.2).unwrap();
        for c in generate_ledger(11, 100).iter().filter(|c| c.is_open) {
            assert!(c.end_date.unwrap() > as_of, "{} is open but ended", c.contract_id);
        }
    }
}
