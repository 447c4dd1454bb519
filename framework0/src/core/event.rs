//! Run lifecycle events.

use super::RunState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

/// An event emitted by the scheduler during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// The event type (e.g., "step.started").
    #[serde(rename = "type")]
    pub event_type: String,

    /// The run that produced the event.
    pub run_id: Uuid,

    /// When the event occurred.
    pub timestamp: DateTime<Utc>,

    /// The event payload.
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl RunEvent {
    /// Creates an event with an empty payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, run_id: Uuid) -> Self {
        Self {
            event_type: event_type.into(),
            run_id,
            timestamp: Utc::now(),
            data: serde_json::Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn add_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Returns a payload field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Creates a "run.started" event.
    #[must_use]
    pub fn run_started(run_id: Uuid, step_count: usize, parallel: bool) -> Self {
        Self::new("run.started", run_id)
            .add_data("step_count", json!(step_count))
            .add_data("parallel", json!(parallel))
    }

    /// Creates a "run.state_changed" event.
    #[must_use]
    pub fn state_changed(run_id: Uuid, from: RunState, to: RunState) -> Self {
        Self::new("run.state_changed", run_id)
            .add_data("from", json!(from))
            .add_data("to", json!(to))
    }

    /// Creates a "step.started" event.
    #[must_use]
    pub fn step_started(run_id: Uuid, step: &str) -> Self {
        Self::new("step.started", run_id).add_data("step", json!(step))
    }

    /// Creates a "step.completed" event.
    #[must_use]
    pub fn step_completed(run_id: Uuid, step: &str, duration_secs: f64) -> Self {
        Self::new("step.completed", run_id)
            .add_data("step", json!(step))
            .add_data("duration", json!(duration_secs))
    }

    /// Creates a "step.failed" event.
    #[must_use]
    pub fn step_failed(run_id: Uuid, step: &str, exit_code: i32, error: Option<&str>) -> Self {
        Self::new("step.failed", run_id)
            .add_data("step", json!(step))
            .add_data("exit_code", json!(exit_code))
            .add_data("error", json!(error))
    }

    /// Creates a "step.resolution_retry" event.
    #[must_use]
    pub fn resolution_retry(run_id: Uuid, step: &str, attempt: u32, error: &str) -> Self {
        Self::new("step.resolution_retry", run_id)
            .add_data("step", json!(step))
            .add_data("attempt", json!(attempt))
            .add_data("error", json!(error))
    }

    /// Creates a "run.rolled_back" event.
    #[must_use]
    pub fn rolled_back(run_id: Uuid, reason: &str) -> Self {
        Self::new("run.rolled_back", run_id).add_data("reason", json!(reason))
    }

    /// Creates a "run.completed" event.
    #[must_use]
    pub fn run_completed(run_id: Uuid, state: RunState, duration_secs: f64) -> Self {
        Self::new("run.completed", run_id)
            .add_data("state", json!(state))
            .add_data("duration", json!(duration_secs))
    }
}
