//! Scheduler configuration.

use super::RetryPolicy;
use crate::errors::Framework0Error;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// When the scheduler restores the `pre_execution` snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollbackPolicy {
    /// Never restore.
    Never,
    /// Restore when the harness itself fails.
    #[default]
    OnAbort,
    /// Restore when the run aborts or any step fails.
    OnFailure,
}

/// Configuration for a [`super::Scheduler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run steps concurrently as their dependencies complete.
    #[serde(default)]
    pub parallel: bool,
    /// Maximum number of steps in flight in parallel mode.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// Overall run deadline in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Build and check the dependency graph before running anything.
    #[serde(default = "default_validate_dependencies")]
    pub validate_dependencies: bool,
    /// Steps whose failure cancels everything not yet started.
    #[serde(default = "default_critical_steps")]
    pub critical_steps: Vec<String>,
    /// Context rollback policy.
    #[serde(default)]
    pub rollback: RollbackPolicy,
    /// Retry policy for resolving step implementations.
    #[serde(default)]
    pub resolution_retry: RetryPolicy,
    /// When non-empty, run only these steps.
    #[serde(default)]
    pub only: Vec<String>,
    /// Steps to leave out.
    #[serde(default)]
    pub skip: Vec<String>,
}

fn default_max_workers() -> usize {
    4
}

fn default_validate_dependencies() -> bool {
    true
}

fn default_critical_steps() -> Vec<String> {
    vec!["init".to_string(), "setup".to_string()]
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_workers: default_max_workers(),
            timeout_seconds: None,
            validate_dependencies: default_validate_dependencies(),
            critical_steps: default_critical_steps(),
            rollback: RollbackPolicy::default(),
            resolution_retry: RetryPolicy::default(),
            only: Vec::new(),
            skip: Vec::new(),
        }
    }
}

impl SchedulerConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from YAML. Missing fields take their defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, Framework0Error> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Loads a configuration from a YAML (or JSON) file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, Framework0Error> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Enables or disables parallel mode.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Sets the worker pool size.
    #[must_use]
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = workers;
        self
    }

    /// Sets the run timeout.
    #[must_use]
    pub fn with_timeout_seconds(mut self, seconds: f64) -> Self {
        self.timeout_seconds = Some(seconds);
        self
    }

    /// Enables or disables up-front graph validation.
    #[must_use]
    pub fn with_validate_dependencies(mut self, validate: bool) -> Self {
        self.validate_dependencies = validate;
        self
    }

    /// Replaces the critical step list.
    #[must_use]
    pub fn with_critical_steps(mut self, steps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.critical_steps = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the rollback policy.
    #[must_use]
    pub fn with_rollback(mut self, policy: RollbackPolicy) -> Self {
        self.rollback = policy;
        self
    }

    /// Sets the resolution retry policy.
    #[must_use]
    pub fn with_resolution_retry(mut self, policy: RetryPolicy) -> Self {
        self.resolution_retry = policy;
        self
    }

    /// Restricts the run to the named steps.
    #[must_use]
    pub fn with_only(mut self, steps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.only = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Leaves the named steps out of the run.
    #[must_use]
    pub fn with_skip(mut self, steps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.skip = steps.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the run timeout as a `Duration`, if one is set and valid.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_seconds
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    }

    /// Returns true if `step` is in the critical list.
    #[must_use]
    pub fn is_critical(&self, step: &str) -> bool {
        self.critical_steps.iter().any(|name| name == step)
    }

    /// Checks values that serde cannot.
    pub fn validate(&self) -> Result<(), Framework0Error> {
        if self.max_workers == 0 {
            return Err(Framework0Error::InvalidRecipe(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if let Some(secs) = self.timeout_seconds {
            if !secs.is_finite() || secs <= 0.0 {
                return Err(Framework0Error::InvalidRecipe(format!(
                    "timeout_seconds must be a positive number, got {secs}"
                )));
            }
            if Duration::try_from_secs_f64(secs).is_err() {
                return Err(Framework0Error::InvalidRecipe(format!(
                    "timeout_seconds is too large, got {secs}"
                )));
            }
        }
        Ok(())
    }
}
