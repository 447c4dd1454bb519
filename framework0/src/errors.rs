//! Error types for the framework0 core.
//!
//! Context errors are programmer errors and always propagate. Step failures
//! are not errors at all: they are captured as `StepResult`s. Validation
//! errors abort a run before any step executes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for framework0 operations.
#[derive(Debug, Error)]
pub enum Framework0Error {
    /// A context operation was rejected.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The step graph failed validation.
    #[error("{0}")]
    Validation(#[from] DependencyValidationError),

    /// A step implementation could not be resolved.
    #[error("{0}")]
    Resolution(#[from] ResolutionError),

    /// A recipe or configuration document is malformed.
    #[error("Invalid recipe: {0}")]
    InvalidRecipe(String),

    /// The step-execution harness itself failed.
    #[error("Internal error: {0}")]
    Internal(String),

    /// YAML (de)serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by [`crate::context::Context`] operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The snapshot id is unknown (never created, or discarded).
    #[error("Snapshot not found: {id}")]
    SnapshotNotFound {
        /// The requested snapshot id.
        id: String,
    },

    /// A write was attempted without naming the writer.
    #[error("Write to '{key}' rejected: attribution ('who') must not be empty")]
    MissingAttribution {
        /// The key that was being written.
        key: String,
    },

    /// The key is not a valid dot-separated name.
    #[error("Invalid context key '{key}': {reason}")]
    InvalidKey {
        /// The offending key.
        key: String,
        /// Why it was rejected.
        reason: String,
    },
}

impl ContextError {
    /// Creates a snapshot-not-found error.
    #[must_use]
    pub fn snapshot_not_found(id: impl ToString) -> Self {
        Self::SnapshotNotFound { id: id.to_string() }
    }

    /// Creates a missing-attribution error.
    #[must_use]
    pub fn missing_attribution(key: impl Into<String>) -> Self {
        Self::MissingAttribution { key: key.into() }
    }

    /// Creates an invalid-key error.
    #[must_use]
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Diagnostic metadata attached to validation errors.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ErrorInfo {
    /// Error code (e.g., "RECIPE-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: HashMap<String, String>,
}

impl ErrorInfo {
    /// Creates new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: HashMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a cycle is detected in a dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Cyclic dependency detected: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The tasks forming the cycle; the first task is repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

/// Errors produced while ordering a [`crate::pipeline::DependencyGraph`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The graph is not acyclic.
    #[error("{0}")]
    Cycle(#[from] CycleDetectedError),

    /// A task depends on a name that was never registered.
    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        /// The dependent task.
        task: String,
        /// The missing dependency.
        dependency: String,
    },
}

/// Error raised when a step list fails validation before execution.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct DependencyValidationError {
    /// The error message.
    pub message: String,
    /// The steps involved in the error.
    pub steps: Vec<String>,
    /// Diagnostic info.
    pub error_info: Option<ErrorInfo>,
}

impl DependencyValidationError {
    /// Creates a new validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            steps: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the steps involved.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.steps = steps;
        self
    }

    /// Sets the diagnostic info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Creates an error for a step name registered twice.
    #[must_use]
    pub fn duplicate_step(name: &str) -> Self {
        Self::new(format!("Step '{name}' is defined more than once"))
            .with_steps(vec![name.to_string()])
            .with_error_info(
                ErrorInfo::new("RECIPE-DUPLICATE", format!("Duplicate step name '{name}'"))
                    .with_fix_hint("Step names must be unique within a recipe."),
            )
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

impl From<GraphError> for DependencyValidationError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Cycle(cycle) => Self::new(cycle.to_string())
                .with_steps(cycle.cycle_path.clone())
                .with_error_info(
                    ErrorInfo::new(
                        "RECIPE-CYCLE",
                        format!("Steps form a dependency cycle: {}", cycle.cycle_path.join(" -> ")),
                    )
                    .with_fix_hint("Remove one of the dependencies in the cycle to break it."),
                ),
            GraphError::UnknownDependency { task, dependency } => Self::new(format!(
                "Step '{task}' depends on unknown step '{dependency}'"
            ))
            .with_steps(vec![task.clone(), dependency.clone()])
            .with_error_info(
                ErrorInfo::new("RECIPE-MISSING_DEP", format!("Dependency '{dependency}' not found"))
                    .with_context_entry("step", task)
                    .with_fix_hint("Check depends_on for typos or filtered-out steps."),
            ),
        }
    }
}

/// Failure to resolve a step's implementation from the registry.
///
/// These are the only failures the scheduler retries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    /// Nothing is registered under the key.
    #[error("No step registered for '{key}'")]
    NotFound {
        /// The registry key (`module.function`).
        key: String,
    },

    /// A registered factory failed to build the step.
    #[error("Factory for '{key}' failed: {reason}")]
    Factory {
        /// The registry key.
        key: String,
        /// The factory's error message.
        reason: String,
    },
}

impl ResolutionError {
    /// Returns the registry key involved.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::NotFound { key } | Self::Factory { key, .. } => key,
        }
    }
}

/// Convenience alias for results in this crate.
pub type Result<T, E = Framework0Error> = std::result::Result<T, E>;
