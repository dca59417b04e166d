//! Matcher integration tests: the rule cascade over small hand-built ledgers.
//!
//! Verifies that:
//!   - Links are transitive across different rules
//!   - Strict bank matching never fires on a differing sort code
//!   - Common names are kept out of the Name + Postcode rule
//!   - Placeholder phones never link anyone
//!   - A pair linked by an earlier rule is not logged again by a later one
//!   - Every contract ends up in exactly one cluster

use nfr_core::{
    config::MatchConfig,
    contract::ContractRecord,
    matcher::{
        resolve, ConfidenceTier, RULE_BANK_NO_NAME, RULE_BANK_SURNAME, RULE_FUZZY_NAME,
        RULE_NAME_PHONE, RULE_NAME_POSTCODE, RULE_SURNAME_PHONE_POSTCODE,
    },
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn contract(id: &str, sortname: &str) -> ContractRecord {
    ContractRecord {
        sortname: Some(sortname.into()),
        ..ContractRecord::new(id)
    }
}

fn with_bank(mut c: ContractRecord, sortcode: &str, account: &str) -> ContractRecord {
    c.bank_sortcode = Some(sortcode.into());
    c.account_number = Some(account.into());
    c
}

fn with_phone(mut c: ContractRecord, phone: &str) -> ContractRecord {
    c.phone = Some(phone.into());
    c
}

fn with_postcode(mut c: ContractRecord, postcode: &str) -> ContractRecord {
    c.postcode = Some(postcode.into());
    c
}

fn rules_fired(contracts: &[ContractRecord]) -> Vec<String> {
    resolve(contracts, &MatchConfig::default())
        .events
        .into_iter()
        .map(|e| e.rule_name)
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// A–B share bank details, B–C share name and phone. A and C are never
/// compared directly but must land in the same cluster.
#[test]
fn clustering_is_transitive_across_rules() {
    let contracts = vec![
        with_bank(contract("A", "SMITH JOHN"), "112233", "44556677"),
        with_phone(
            with_bank(contract("B", "SMITH JOHN"), "112233", "44556677"),
            "07700900123",
        ),
        with_phone(contract("C", "SMITH JOHN"), "07700 900123"),
        contract("D", "JONES MARY"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    let a = &resolution.assignments["A"];
    assert_eq!(a, &resolution.assignments["B"]);
    assert_eq!(a, &resolution.assignments["C"]);
    assert_ne!(a, &resolution.assignments["D"]);
    assert_eq!(resolution.clusters.len(), 2);

    let rules: Vec<&str> = resolution.events.iter().map(|e| e.rule_name.as_str()).collect();
    assert_eq!(rules, vec![RULE_BANK_NO_NAME, RULE_NAME_PHONE]);
}

/// Same account number under different sort codes is not a strict bank match.
#[test]
fn differing_sort_code_does_not_link_on_bank_rule() {
    let contracts = vec![
        with_bank(contract("A", "BROWN ALICE"), "123456", "1234567"),
        with_bank(contract("B", "GREEN PETER"), "654321", "1234567"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert!(resolution.events.is_empty(), "Unexpected links: {:?}", resolution.events);
    assert_ne!(resolution.assignments["A"], resolution.assignments["B"]);
}

/// Hyphenated and plain sort codes normalise to the same strict key.
#[test]
fn formatted_bank_details_link_on_strict_rule() {
    let contracts = vec![
        with_bank(contract("A", "BROWN ALICE"), "12-34-56", "12345678"),
        with_bank(contract("B", "GREEN PETER"), "123456", "1234 5678"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.events.len(), 1);
    assert_eq!(resolution.events[0].rule_name, RULE_BANK_NO_NAME);
    assert_eq!(resolution.events[0].confidence_tier, ConfidenceTier::VeryHigh);
}

/// Malformed bank details fall through to the raw rule, which also needs
/// a matching surname.
#[test]
fn malformed_bank_details_need_matching_surname() {
    let contracts = vec![
        with_bank(contract("A", "BROWN ALICE"), "12345", "ACC-99"),
        with_bank(contract("B", "brown bob"), "12345", "ACC-99"),
        with_bank(contract("C", "GREEN PETER"), "12345", "ACC-99"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.assignments["A"], resolution.assignments["B"]);
    assert_ne!(resolution.assignments["A"], resolution.assignments["C"]);
    assert_eq!(rules_fired(&contracts), vec![RULE_BANK_SURNAME]);
}

/// Five contracts share a full name and postcode. The name is common, so
/// Name + Postcode must not fire; the fuzzy rule may still link them.
#[test]
fn common_names_are_excluded_from_name_postcode_rule() {
    let contracts: Vec<ContractRecord> = (0..5)
        .map(|i| with_postcode(contract(&format!("C{i}"), "SMITH JOHN"), "LS1 4AB"))
        .collect();

    let fired = rules_fired(&contracts);

    assert!(
        !fired.iter().any(|r| r == RULE_NAME_POSTCODE),
        "Name + Postcode fired for a common name: {fired:?}"
    );
    assert!(fired.iter().all(|r| r == RULE_FUZZY_NAME));
}

/// Below the threshold the same shape links on Name + Postcode.
#[test]
fn uncommon_names_link_on_name_postcode_rule() {
    let contracts: Vec<ContractRecord> = (0..4)
        .map(|i| with_postcode(contract(&format!("C{i}"), "SMITH JOHN"), "ls1 4ab"))
        .collect();

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.clusters.len(), 1);
    assert_eq!(resolution.events.len(), 3);
    assert!(resolution.events.iter().all(|e| e.rule_name == RULE_NAME_POSTCODE));
}

/// Placeholder and all-zero phones are "no phone on file".
#[test]
fn placeholder_phones_never_link() {
    let contracts = vec![
        with_phone(contract("A", "TAYLOR SAM"), "00000000000"),
        with_phone(contract("B", "TAYLOR SAM"), "0000 000 0000"),
        with_phone(contract("C", "TAYLOR SAM"), "01234 567890"),
        with_phone(contract("D", "TAYLOR SAM"), "01234567890"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert!(resolution.events.is_empty(), "Unexpected links: {:?}", resolution.events);
    assert_eq!(resolution.clusters.len(), 4);
}

/// Surname + phone + postcode links differing first names.
#[test]
fn surname_phone_postcode_links_different_first_names() {
    let contracts = vec![
        with_postcode(with_phone(contract("A", "PATEL RAVI"), "07700900001"), "M1 1AE"),
        with_postcode(with_phone(contract("B", "PATEL ANITA"), "07700900001"), "M11AE"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.events.len(), 1);
    assert_eq!(resolution.events[0].rule_name, RULE_SURNAME_PHONE_POSTCODE);
    assert_eq!(resolution.events[0].confidence_tier, ConfidenceTier::Moderate);
}

/// Fuzzy rule links "SMITH JONATHAN" and "SMITH JON P" on postcode alone.
#[test]
fn fuzzy_name_links_on_first_name_prefix() {
    let contracts = vec![
        with_postcode(contract("A", "SMITH JONATHAN"), "B1 1AA"),
        with_postcode(contract("B", "SMITH JON P"), "B1 1AA"),
        with_postcode(contract("C", "SMITH JANE"), "B1 1AA"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.assignments["A"], resolution.assignments["B"]);
    assert_ne!(resolution.assignments["A"], resolution.assignments["C"]);
    assert_eq!(resolution.events.len(), 1);
    assert_eq!(resolution.events[0].rule_name, RULE_FUZZY_NAME);
}

/// With no postcode on file, the fuzzy rule links on phone alone.
#[test]
fn fuzzy_name_links_on_phone_without_postcode() {
    let contracts = vec![
        with_phone(contract("A", "HUGHES CATHERINE"), "07700 900777"),
        with_phone(contract("B", "HUGHES CATH"), "07700900777"),
        with_phone(contract("C", "HUGHES DAVID"), "07700900777"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.assignments["A"], resolution.assignments["B"]);
    assert_ne!(resolution.assignments["A"], resolution.assignments["C"]);
    assert_eq!(resolution.events.len(), 1);
    assert_eq!(resolution.events[0].rule_name, RULE_FUZZY_NAME);
    assert_eq!(resolution.events[0].confidence_tier, ConfidenceTier::Moderate);
}

/// Two contracts that satisfy every rule are logged once, by the first rule.
#[test]
fn already_linked_pairs_are_not_logged_again() {
    let base = |id: &str| {
        with_postcode(
            with_phone(with_bank(contract(id, "WOOD EMMA"), "112233", "44556677"), "07700900555"),
            "YO1 7HH",
        )
    };
    let contracts = vec![base("A"), base("B")];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.events.len(), 1);
    assert_eq!(resolution.events[0].rule_name, RULE_BANK_NO_NAME);
}

/// Every event's customer id equals both contracts' final assignment.
#[test]
fn events_carry_final_customer_id() {
    let contracts = vec![
        with_bank(contract("A", "SMITH JOHN"), "112233", "44556677"),
        with_bank(contract("B", "SMITH JOHN"), "112233", "44556677"),
        with_phone(contract("C", "SMITH JOHN"), "07700900123"),
        with_phone(contract("D", "SMITH JOHN"), "07700900123"),
        with_postcode(with_phone(contract("E", "SMITH JOHNNY"), "07700900123"), "LS1 4AB"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    for e in &resolution.events {
        assert_eq!(e.assigned_customer_id, resolution.assignments[&e.contract_id_a]);
        assert_eq!(e.assigned_customer_id, resolution.assignments[&e.contract_id_b]);
    }
}

/// Every contract is assigned exactly once, singletons included.
#[test]
fn every_contract_lands_in_one_cluster() {
    let contracts = vec![
        contract("A", "SMITH JOHN"),
        ContractRecord::new("B"),
        with_bank(contract("C", "JONES AMY"), "112233", "44556677"),
        with_bank(contract("D", "JONES AMY"), "112233", "44556677"),
    ];

    let resolution = resolve(&contracts, &MatchConfig::default());

    assert_eq!(resolution.assignments.len(), 4);
    let clustered: usize = resolution.clusters.values().map(Vec::len).sum();
    assert_eq!(clustered, 4);
    assert_eq!(resolution.clusters.len(), 3);
    assert_eq!(resolution.summary().multi_contract_customers, 1);
}

/// Customer ids follow the configured prefix and are numbered from the
/// smallest contract_id upwards, regardless of input order.
#[test]
fn customer_ids_are_stable_for_the_same_input() {
    let contracts = vec![
        with_bank(contract("Z9", "JONES AMY"), "112233", "44556677"),
        contract("M1", "SMITH JOHN"),
        with_bank(contract("A1", "JONES AMY"), "112233", "44556677"),
    ];
    let mut reversed = contracts.clone();
    reversed.reverse();

    let config = MatchConfig { customer_id_prefix: "C".into(), ..MatchConfig::default() };
    let first = resolve(&contracts, &config);
    let second = resolve(&reversed, &config);

    assert_eq!(first.assignments, second.assignments);
    assert_eq!(first.assignments["A1"], "C000001");
    assert_eq!(first.assignments["Z9"], "C000001");
    assert_eq!(first.assignments["M1"], "C000002");
}
