//! Worker side of the cube task orchestrator.
//!
//! A worker pulls [`tasks::types::TaskEvent`]s off its queue one at a time,
//! checks them against the task state machine and drives a container runtime
//! to start or stop the matching workload. The resulting state of every task
//! it has seen is kept in the worker's ledger.

pub mod config;
pub mod error;
pub mod tasks;
pub mod worker;
