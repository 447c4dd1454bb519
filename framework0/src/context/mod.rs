//! Shared context for recipe execution.
//!
//! This module provides:
//! - The attributed key-value store with change history
//! - Point-in-time snapshots for rollback
//! - The per-step view handed to running steps

#[cfg(test)]
mod context_tests;
mod execution;
mod history;
mod snapshot;
mod store;

pub use execution::{StepArgs, StepContext};
pub use history::ChangeRecord;
pub use snapshot::{SnapshotId, SnapshotInfo};
pub use store::Context;
