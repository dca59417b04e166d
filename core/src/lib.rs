//! Net Finance Retained (NFR) batch core.
//!
//! Two stages run in sequence over the contract store:
//!   1. `matcher` clusters contracts into customers (union-find over a
//!      fixed cascade of identity rules).
//!   2. `retention` looks, for every closed contract, for the customer's
//!      next contract inside each configured window.
//!
//! `pipeline::NfrPipeline` wires both stages to a `store::ContractStore`.

pub mod config;
pub mod contract;
pub mod disjoint_set;
pub mod error;
pub mod group;
pub mod identity;
pub mod matcher;
pub mod name_generator;
pub mod pipeline;
pub mod retention;
pub mod rng;
pub mod stage;
pub mod store;
pub mod synthetic;
pub mod types;
