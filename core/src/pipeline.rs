//! The NFR pipeline. Runs the batch stages over the contract store.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Matcher          (assigns customer_id, rebuilds match_event)
//!   2. RetentionEngine  (rebuilds retention_result from customer_id)
//!
//! RULES:
//!   - Every run recomputes both stages from scratch.
//!   - Each stage commits its own write-back atomically; a stage that
//!     fails leaves its previous results in place.
//!   - Runs must not overlap. `run()` takes `&mut self`, so one pipeline
//!     value serialises its callers; separate processes sharing a database
//!     file must queue runs themselves.

use chrono::Utc;

use crate::{
    config::NfrConfig,
    error::NfrResult,
    matcher::{MatchSummary, Matcher},
    retention::{RetentionEngine, RetentionSummary},
    stage::{BatchStage, StageReport},
    store::{ContractStore, PipelineRunRow},
    types::RunId,
};

/// What one completed run produced. Handed to the caller for audit.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id:    RunId,
    pub matching:  MatchSummary,
    pub retention: RetentionSummary,
}

pub struct NfrPipeline {
    config: NfrConfig,
    stages: Vec<Box<dyn BatchStage>>,
    store:  ContractStore,
}

impl NfrPipeline {
    /// Build a pipeline with both stages registered in execution order.
    pub fn build(config: NfrConfig, store: ContractStore) -> NfrResult<Self> {
        config.validate()?;
        let stages: Vec<Box<dyn BatchStage>> = vec![
            Box::new(Matcher::new(config.matching.clone())),
            Box::new(RetentionEngine::new(config.retention.clone())),
        ];
        Ok(Self { config, stages, store })
    }

    pub fn store(&self) -> &ContractStore {
        &self.store
    }

    pub fn config(&self) -> &NfrConfig {
        &self.config
    }

    /// Run every stage once. On failure the run is recorded as failed
    /// and the stage's error is returned.
    pub fn run(&mut self) -> NfrResult<RunSummary> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let started_at = Utc::now().to_rfc3339();
        log::info!("pipeline: run {run_id} started");

        let mut reports = Vec::with_capacity(self.stages.len());
        for stage in &self.stages {
            match stage.run(&self.store) {
                Ok(report) => reports.push((stage.name(), report)),
                Err(err) => {
                    log::error!("pipeline: run {run_id} failed in {}: {err}", stage.name());
                    let failed = PipelineRunRow {
                        run_id:      run_id.clone(),
                        status:      "failed".into(),
                        started_at:  started_at.clone(),
                        finished_at: Utc::now().to_rfc3339(),
                        version:     env!("CARGO_PKG_VERSION").into(),
                        error:       Some(format!("{}: {err}", stage.name())),
                    };
                    if let Err(audit_err) = self.store.insert_pipeline_run(&failed) {
                        log::warn!("pipeline: could not record failed run {run_id}: {audit_err}");
                    }
                    return Err(err);
                }
            }
        }

        self.store.insert_pipeline_run(&PipelineRunRow {
            run_id:      run_id.clone(),
            status:      "completed".into(),
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            version:     env!("CARGO_PKG_VERSION").into(),
            error:       None,
        })?;

        let mut matching = MatchSummary::default();
        let mut retention = RetentionSummary::default();
        for (stage_name, report) in reports {
            self.store
                .append_stage_log(&run_id, stage_name, &serde_json::to_string(&report)?)?;
            match report {
                StageReport::Match(s) => matching = s,
                StageReport::Retention(s) => retention = s,
            }
        }

        log::info!(
            "pipeline: run {run_id} completed ({} customers, {} retention rows)",
            matching.customers,
            retention.computed,
        );
        Ok(RunSummary { run_id, matching, retention })
    }

    /// Startup recovery: run only when contracts exist but no retention
    /// results do.
    pub fn recover_if_needed(&mut self) -> NfrResult<Option<RunSummary>> {
        let contracts = self.store.contract_count()?;
        let results = self.store.retention_result_count()?;
        if contracts > 0 && results == 0 {
            log::info!("pipeline: {contracts} contracts but no retention results, recovering");
            return self.run().map(Some);
        }
        log::debug!("pipeline: recovery not needed ({contracts} contracts, {results} results)");
        Ok(None)
    }
}
