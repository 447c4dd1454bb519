//! Dependency graphs and recipe scheduling.
//!
//! This module provides:
//! - The task dependency graph and its topological order
//! - Step definitions and scheduler configuration
//! - The sequential and parallel scheduler
//! - Run reports

mod config;
mod graph;
mod report;
mod retry;
mod scheduler;
mod spec;

pub use config::{RollbackPolicy, SchedulerConfig};
pub use graph::DependencyGraph;
pub use report::{ExecutionReport, ExecutionSummary, PerformanceSummary, StepTiming};
pub use retry::{with_retry, RetryPolicy};
pub use scheduler::{
    RunOutcome, Scheduler, ERROR_RECOVERY_IDENTITY, PRE_EXECUTION_SNAPSHOT,
    RESOLUTION_FAILURE_EXIT_CODE, TIMEOUT_EXIT_CODE,
};
pub use spec::StepDefinition;

pub(crate) use spec::assign_indices;
