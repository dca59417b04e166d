//! BatchStage trait and the reports stages hand back.
//!
//! RULE: Every batch stage implements BatchStage.
//! The pipeline calls run() on each stage in registration order.
//! Execution order is fixed and documented in pipeline.rs.

use serde::{Deserialize, Serialize};

use crate::{
    error::NfrResult,
    matcher::MatchSummary,
    retention::RetentionSummary,
    store::ContractStore,
};

/// The contract every batch stage must fulfill.
pub trait BatchStage: Send {
    /// Unique stable name for this stage.
    fn name(&self) -> &'static str;

    /// Read what the stage needs from `store`, recompute from scratch and
    /// write the result back as one atomic replace.
    fn run(&self, store: &ContractStore) -> NfrResult<StageReport>;
}

/// Summary a stage returns on success. Persisted as JSON in the stage log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageReport {
    Match(MatchSummary),
    Retention(RetentionSummary),
}
