//! # Framework0
//!
//! Recipe orchestration core: a shared, attributed context and a
//! dependency-graph scheduler.
//!
//! Framework0 provides:
//!
//! - **Shared context**: a thread-safe key-value store where every write is
//!   attributed and recorded, with snapshot and restore
//! - **Dependency graph**: deterministic topological ordering with cycle
//!   detection
//! - **Scheduling**: sequential fail-fast runs or parallel runs gated on
//!   dependencies, with resolution retry, timeouts and rollback
//! - **Events and reports**: run events for observers and a JSON execution
//!   report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use framework0::prelude::*;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(StepRegistry::with_builtins());
//! let recipe = Recipe::from_file("recipe.yaml")?;
//! let scheduler = Scheduler::new(registry, recipe.scheduler_config());
//!
//! let context = Arc::new(Context::new());
//! let outcome = scheduler.run(recipe.steps, context.clone()).await?;
//! println!("{}", ExecutionReport::new(&outcome, &context).to_json_string()?);
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod pipeline;
pub mod recipe;
pub mod steps;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::context::{ChangeRecord, Context, SnapshotId, SnapshotInfo, StepArgs, StepContext};
    pub use crate::core::{RunEvent, RunState, StepStatus};
    pub use crate::errors::{
        ContextError, CycleDetectedError, DependencyValidationError, Framework0Error,
        GraphError, ResolutionError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{
        DependencyGraph, ExecutionReport, RetryPolicy, RollbackPolicy, RunOutcome, Scheduler,
        SchedulerConfig, StepDefinition,
    };
    pub use crate::recipe::Recipe;
    pub use crate::steps::{AsyncFnStep, FnStep, Step, StepRegistry, StepResult};
}
