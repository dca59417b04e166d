//! Two pipelines, same ledger, same config.
//!
//! They must produce identical customer ids, match logs and retention
//! rows, regardless of the order contracts were loaded in. A divergence
//! here means customer ids move between runs.

use nfr_core::{
    config::NfrConfig,
    contract::ContractRecord,
    pipeline::NfrPipeline,
    store::ContractStore,
    synthetic::generate_ledger,
};

const SEED: u64 = 0xDEAD_BEEF_CAFE_1234;

fn run_pipeline(contracts: &[ContractRecord]) -> NfrPipeline {
    let store = ContractStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store.upsert_contracts(contracts).expect("load contracts");
    let mut pipeline = NfrPipeline::build(NfrConfig::standard(), store).expect("build");
    pipeline.run().expect("run");
    pipeline
}

/// Match log and retention rows as JSON lines, in a stable order.
fn collect_output_log(pipeline: &NfrPipeline) -> Vec<String> {
    let store = pipeline.store();
    let mut log: Vec<String> = store
        .all_contracts()
        .expect("read contracts")
        .iter()
        .map(|c| format!("{}={:?}", c.contract_id, c.customer_id))
        .collect();
    log.extend(
        store
            .match_events()
            .expect("read events")
            .iter()
            .map(|e| serde_json::to_string(e).expect("serialize event")),
    );
    for c in store.all_contracts().expect("read contracts") {
        if let Some(r) = store.retention_result(&c.contract_id).expect("read result") {
            log.push(serde_json::to_string(&r).expect("serialize result"));
        }
    }
    log
}

#[test]
fn same_ledger_produces_identical_output() {
    let ledger = generate_ledger(SEED, 500);

    let log_a = collect_output_log(&run_pipeline(&ledger));
    let log_b = collect_output_log(&run_pipeline(&ledger));

    assert_eq!(
        log_a.len(), log_b.len(),
        "Output lengths differ: {} vs {}",
        log_a.len(), log_b.len()
    );
    for (i, (a, b)) in log_a.iter().zip(log_b.iter()).enumerate() {
        assert_eq!(a, b, "Output diverged at entry {i}:\n  A: {a}\n  B: {b}");
    }
}

#[test]
fn load_order_does_not_change_customer_ids() {
    let ledger = generate_ledger(SEED, 200);
    let mut reversed = ledger.clone();
    reversed.reverse();

    let forward = run_pipeline(&ledger);
    let backward = run_pipeline(&reversed);

    assert_eq!(
        forward.store().customer_clusters().expect("clusters"),
        backward.store().customer_clusters().expect("clusters"),
    );
}

#[test]
fn different_seeds_produce_different_ledgers() {
    let log_a = collect_output_log(&run_pipeline(&generate_ledger(42, 100)));
    let log_b = collect_output_log(&run_pipeline(&generate_ledger(99, 100)));

    assert_ne!(log_a, log_b, "Different seeds produced identical output; seed is not being used");
}
