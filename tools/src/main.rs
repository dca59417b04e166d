//! nfr-runner: headless NFR pipeline runner.
//!
//! Usage:
//!   nfr-runner --db ledger.db --contracts contracts.json
//!   nfr-runner --synthetic 5000 --seed 12345 --config data/nfr_config.json
//!   nfr-runner --db ledger.db --recover

use anyhow::Result;
use nfr_core::{
    config::NfrConfig,
    contract::ContractRecord,
    pipeline::{NfrPipeline, RunSummary},
    store::ContractStore,
    synthetic::generate_ledger,
};
use std::env;

#[derive(serde::Serialize)]
struct WindowRate {
    label:    String,
    ended:    i64,
    retained: i64,
    rate:     f64,
}

#[derive(serde::Serialize)]
struct JsonReport<'a> {
    run_id:              Option<&'a str>,
    contracts:           i64,
    customers:           i64,
    match_pairs_by_rule: std::collections::BTreeMap<String, i64>,
    windows:             Vec<WindowRate>,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = flag_value(&args, "--db").unwrap_or(":memory:");
    let config_path = flag_value(&args, "--config");
    let contracts_path = flag_value(&args, "--contracts");
    let synthetic = parse_arg(&args, "--synthetic", 0usize);
    let seed = parse_arg(&args, "--seed", 42u64);
    let recover = args.iter().any(|a| a == "--recover");
    let json = args.iter().any(|a| a == "--json");

    let config = match config_path {
        Some(path) => NfrConfig::load(path)?,
        None => NfrConfig::standard(),
    };

    if !json {
        println!("NFR nfr-runner");
        println!("  db:        {db}");
        println!("  config:    {}", config_path.unwrap_or("(built-in)"));
        if synthetic > 0 {
            println!("  synthetic: {synthetic} customers (seed {seed})");
        }
        println!();
    }

    let store = ContractStore::open(db)?;
    store.migrate()?;

    if let Some(path) = contracts_path {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let contracts: Vec<ContractRecord> = serde_json::from_str(&content)?;
        let n = store.upsert_contracts(&contracts)?;
        log::info!("loaded {n} contracts from {path}");
    }
    if synthetic > 0 {
        let contracts = generate_ledger(seed, synthetic);
        let n = store.upsert_contracts(&contracts)?;
        log::info!("loaded {n} synthetic contracts");
    }

    let mut pipeline = NfrPipeline::build(config, store)?;
    let summary = if recover {
        pipeline.recover_if_needed()?
    } else {
        Some(pipeline.run()?)
    };

    if json {
        print_json(&pipeline, summary.as_ref())
    } else {
        print_summary(&pipeline, summary.as_ref())
    }
}

fn window_rates(pipeline: &NfrPipeline) -> Result<Vec<WindowRate>> {
    let mut rates = Vec::new();
    for window in &pipeline.config().retention.windows {
        let r = pipeline.store().retention_rate(&window.label)?;
        rates.push(WindowRate {
            label:    window.label.clone(),
            ended:    r.ended,
            retained: r.retained,
            rate:     r.rate,
        });
    }
    Ok(rates)
}

fn print_json(pipeline: &NfrPipeline, summary: Option<&RunSummary>) -> Result<()> {
    let store = pipeline.store();
    let report = JsonReport {
        run_id:              summary.map(|s| s.run_id.as_str()),
        contracts:           store.contract_count()?,
        customers:           store.customer_count()?,
        match_pairs_by_rule: store.match_event_counts_by_rule()?,
        windows:             window_rates(pipeline)?,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_summary(pipeline: &NfrPipeline, summary: Option<&RunSummary>) -> Result<()> {
    let store = pipeline.store();

    println!("=== RUN SUMMARY ===");
    match summary {
        Some(s) => {
            println!("  run_id:          {}", s.run_id);
            println!("  multi-contract:  {}", s.matching.multi_contract_customers);
            println!("  skipped:         {}", s.retention.skipped_missing_end_date);
        }
        None => println!("  (results present, nothing recomputed)"),
    }
    println!("  contracts:       {}", store.contract_count()?);
    println!("  customers:       {}", store.customer_count()?);
    println!("  retention rows:  {}", store.retention_result_count()?);

    println!();
    println!("=== MATCH PAIRS BY RULE ===");
    let pairs = store.match_event_counts_by_rule()?;
    if pairs.is_empty() {
        println!("  (no contracts linked)");
    }
    for (rule, count) in &pairs {
        println!("  {rule:<32} {count}");
    }

    println!();
    println!("=== NFR BY WINDOW ===");
    for w in window_rates(pipeline)? {
        println!(
            "  {:<10} {:>6} / {:<6} {:.1}%",
            w.label, w.retained, w.ended, w.rate
        );
    }
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
