//! Shared primitive types used across the matcher and retention engine.

/// Externally supplied, immutable contract identifier.
pub type ContractId = String;

/// Synthetic customer identifier assigned by the matcher.
pub type CustomerId = String;

/// Identifier of one pipeline run (audit log key).
pub type RunId = String;
