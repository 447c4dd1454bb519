//! Per-step execution results.

use crate::core::StepStatus;
use serde::{Deserialize, Serialize};

/// Exit code reported when a step's implementation cannot be resolved.
pub const RESOLUTION_FAILURE_EXIT_CODE: i32 = 127;

/// Exit code for steps that stopped early because the run was cancelled.
pub const INTERRUPTED_EXIT_CODE: i32 = 130;

/// Error a step returns to fail with a specific exit code and message.
///
/// Any other error fails the step with exit code 1.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct StepFailure {
    /// The exit code to record. Zero is recorded as 1.
    pub exit_code: i32,
    /// The error message.
    pub message: String,
}

impl StepFailure {
    /// Creates a failure with an exit code and message.
    #[must_use]
    pub fn new(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code: if exit_code == 0 { 1 } else { exit_code },
            message: message.into(),
        }
    }
}

/// Exit code recorded for an error returned by a step.
#[must_use]
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<StepFailure>()
        .map_or(1, |failure| failure.exit_code)
}

/// The recorded outcome of running one step.
///
/// `context_changes` lists keys present after the step that were absent
/// before it, sorted. Overwrites of existing keys are not detected; use
/// the context history for exact attribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    /// The step name.
    pub step_name: String,
    /// Whether the step succeeded.
    pub success: bool,
    /// The exit code (0 on success).
    pub exit_code: i32,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Keys added to the context by this step.
    #[serde(default)]
    pub context_changes: Vec<String>,
}

impl StepResult {
    /// Creates a success result.
    #[must_use]
    pub fn succeeded(step_name: impl Into<String>, duration: f64, context_changes: Vec<String>) -> Self {
        Self {
            step_name: step_name.into(),
            success: true,
            exit_code: 0,
            duration,
            error_message: None,
            context_changes,
        }
    }

    /// Creates a failure result.
    #[must_use]
    pub fn failed(
        step_name: impl Into<String>,
        exit_code: i32,
        error_message: impl Into<String>,
        duration: f64,
    ) -> Self {
        Self {
            step_name: step_name.into(),
            success: false,
            exit_code,
            duration,
            error_message: Some(error_message.into()),
            context_changes: Vec::new(),
        }
    }

    /// Sets the context changes.
    #[must_use]
    pub fn with_context_changes(mut self, changes: Vec<String>) -> Self {
        self.context_changes = changes;
        self
    }

    /// Returns the step status implied by the result.
    #[must_use]
    pub fn status(&self) -> StepStatus {
        if self.success {
            StepStatus::Succeeded
        } else {
            StepStatus::Failed
        }
    }
}
