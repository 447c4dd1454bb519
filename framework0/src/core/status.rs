//! Run state machine and step status enums.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a single recipe run.
///
/// `Loaded -> Validated -> Executing -> {Completed | Failed | Aborted}`.
/// Validation failure moves straight from `Loaded` to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// Recipe steps are loaded but not yet checked.
    #[default]
    Loaded,
    /// The dependency graph is valid.
    Validated,
    /// Steps are being executed.
    Executing,
    /// Every step succeeded.
    Completed,
    /// Validation failed or at least one step failed.
    Failed,
    /// The harness itself failed; the context was rolled back.
    Aborted,
}

impl RunState {
    /// Returns true if the state is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Aborted)
    }

    /// Returns true if moving from `self` to `next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Loaded, Self::Validated | Self::Failed | Self::Aborted)
                | (Self::Validated, Self::Executing | Self::Aborted)
                | (Self::Executing, Self::Completed | Self::Failed | Self::Aborted)
        )
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded => write!(f, "loaded"),
            Self::Validated => write!(f, "validated"),
            Self::Executing => write!(f, "executing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Aborted => write!(f, "aborted"),
        }
    }
}

/// Outcome category of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started.
    #[default]
    Pending,
    /// Currently running.
    Running,
    /// Finished with exit code 0.
    Succeeded,
    /// Finished with a failure.
    Failed,
    /// Never invoked (fail-fast, failed dependency, or cancellation).
    Skipped,
}

impl StepStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}
