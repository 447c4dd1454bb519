//! Run reports: performance summary and the exported JSON document.

use super::RunOutcome;
use crate::context::Context;
use crate::core::RunState;
use crate::errors::Framework0Error;
use crate::steps::StepResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// A step name with its duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTiming {
    /// The step name.
    pub step_name: String,
    /// Duration in seconds.
    pub duration: f64,
}

/// Timing statistics over the steps of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Wall-clock duration of the whole run in seconds.
    pub total_duration: f64,
    /// Number of steps that ran.
    pub step_count: usize,
    /// Mean step duration in seconds (0 when nothing ran).
    pub average_step_duration: f64,
    /// The slowest step.
    pub slowest_step: Option<StepTiming>,
    /// The fastest step.
    pub fastest_step: Option<StepTiming>,
    /// Sum of `context_changes` over all steps.
    pub total_context_changes: usize,
}

impl PerformanceSummary {
    /// Computes the summary for a set of results.
    #[must_use]
    pub fn from_results(results: &[StepResult], total_duration: f64) -> Self {
        let timing = |result: &StepResult| StepTiming {
            step_name: result.step_name.clone(),
            duration: result.duration,
        };
        let step_count = results.len();
        let step_total: f64 = results.iter().map(|r| r.duration).sum();
        #[allow(clippy::cast_precision_loss)]
        let average_step_duration = if step_count == 0 { 0.0 } else { step_total / step_count as f64 };

        Self {
            total_duration,
            step_count,
            average_step_duration,
            slowest_step: results.iter().max_by(|a, b| a.duration.total_cmp(&b.duration)).map(timing),
            fastest_step: results.iter().min_by(|a, b| a.duration.total_cmp(&b.duration)).map(timing),
            total_context_changes: results.iter().map(|r| r.context_changes.len()).sum(),
        }
    }
}

/// Top-level facts about a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    /// The run id.
    pub run_id: Uuid,
    /// Recipe name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,
    /// Final run state.
    pub state: RunState,
    /// Whether the run completed successfully.
    pub success: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration in seconds.
    pub duration: f64,
    /// Steps that ran.
    pub steps_run: usize,
    /// Steps that succeeded.
    pub steps_succeeded: usize,
    /// Steps that failed.
    pub steps_failed: usize,
    /// Steps never invoked.
    pub skipped_steps: Vec<String>,
    /// Whether the context was rolled back.
    pub rolled_back: bool,
}

/// The exported report document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Run-level summary.
    pub execution_summary: ExecutionSummary,
    /// Per-step results in step order.
    pub step_results: Vec<StepResult>,
    /// Timing statistics.
    pub performance_summary: PerformanceSummary,
    /// The context contents after the run.
    pub context_final_state: BTreeMap<String, serde_json::Value>,
    /// `step: message` pairs for every failure, joined by `; `.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_summary: Option<String>,
}

impl ExecutionReport {
    /// Builds a report from a run outcome and the context it ran against.
    #[must_use]
    pub fn new(outcome: &RunOutcome, context: &Context) -> Self {
        let steps_succeeded = outcome.results.iter().filter(|r| r.success).count();
        Self {
            execution_summary: ExecutionSummary {
                run_id: outcome.run_id,
                recipe: None,
                state: outcome.state,
                success: outcome.success(),
                started_at: outcome.started_at,
                duration: outcome.duration,
                steps_run: outcome.results.len(),
                steps_succeeded,
                steps_failed: outcome.results.len() - steps_succeeded,
                skipped_steps: outcome.skipped.clone(),
                rolled_back: outcome.rolled_back,
            },
            step_results: outcome.results.clone(),
            performance_summary: PerformanceSummary::from_results(&outcome.results, outcome.duration),
            context_final_state: context.to_dict(),
            error_summary: error_summary(outcome),
        }
    }

    /// Sets the recipe name.
    #[must_use]
    pub fn with_recipe_name(mut self, name: impl Into<String>) -> Self {
        self.execution_summary.recipe = Some(name.into());
        self
    }

    /// Serializes the report as pretty JSON.
    pub fn to_json_string(&self) -> Result<String, Framework0Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the report to `path` as pretty JSON.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), Framework0Error> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json_string()?)?;
        info!(path = %path.display(), "Execution report exported");
        Ok(())
    }
}

fn error_summary(outcome: &RunOutcome) -> Option<String> {
    let failures: Vec<String> = outcome
        .failed_results()
        .map(|result| {
            format!(
                "{}: {}",
                result.step_name,
                result.error_message.as_deref().unwrap_or("failed")
            )
        })
        .collect();

    if outcome.state == RunState::Aborted {
        // The harness error names a step that has no result of its own.
        let mut parts = failures;
        parts.extend(outcome.error.clone());
        return Some(parts.join("; "));
    }
    if failures.is_empty() {
        return outcome.error.clone();
    }
    Some(failures.join("; "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn outcome(state: RunState, results: Vec<StepResult>) -> RunOutcome {
        RunOutcome {
            run_id: Uuid::nil(),
            state,
            results,
            skipped: vec!["later".into()],
            started_at: Utc::now(),
            duration: 3.0,
            error: None,
            rolled_back: false,
        }
    }

    #[test]
    fn test_performance_summary() {
        let results = vec![
            StepResult::succeeded("a", 0.5, vec!["a.x".into(), "a.y".into()]),
            StepResult::succeeded("b", 1.5, vec!["b.x".into()]),
            StepResult::failed("c", 1, "boom", 1.0),
        ];
        let summary = PerformanceSummary::from_results(&results, 3.2);

        assert_eq!(summary.step_count, 3);
        assert!((summary.average_step_duration - 1.0).abs() < f64::EPSILON);
        assert_eq!(summary.slowest_step.unwrap().step_name, "b");
        assert_eq!(summary.fastest_step.unwrap().step_name, "a");
        assert_eq!(summary.total_context_changes, 3);
    }

    #[test]
    fn test_empty_summary() {
        let summary = PerformanceSummary::from_results(&[], 0.0);
        assert_eq!(summary.average_step_duration, 0.0);
        assert!(summary.slowest_step.is_none());
    }

    #[test]
    fn test_report_shape_and_error_summary() {
        let ctx = Context::new();
        ctx.set("a.x", 1, "a").unwrap();
        let run = outcome(
            RunState::Failed,
            vec![
                StepResult::succeeded("a", 0.1, vec!["a.x".into()]),
                StepResult::failed("b", 2, "bad data", 0.2),
                StepResult::failed("c", 1, "timeout", 0.3),
            ],
        );

        let report = ExecutionReport::new(&run, &ctx).with_recipe_name("etl");
        let value = serde_json::to_value(&report).unwrap();

        for key in [
            "execution_summary",
            "step_results",
            "performance_summary",
            "context_final_state",
            "error_summary",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["error_summary"], json!("b: bad data; c: timeout"));
        assert_eq!(value["context_final_state"], json!({"a.x": 1}));
        assert_eq!(value["execution_summary"]["recipe"], json!("etl"));
        assert_eq!(value["execution_summary"]["steps_failed"], json!(2));
        assert_eq!(value["execution_summary"]["skipped_steps"], json!(["later"]));
    }

    #[test]
    fn test_successful_report_has_no_error_summary() {
        let run = outcome(RunState::Completed, vec![StepResult::succeeded("a", 0.1, vec![])]);
        let value = serde_json::to_value(ExecutionReport::new(&run, &Context::new())).unwrap();
        assert!(value.get("error_summary").is_none());
        assert_eq!(value["execution_summary"]["success"], json!(true));
    }

    #[test]
    fn test_aborted_report_includes_harness_error() {
        let mut run = outcome(RunState::Aborted, vec![StepResult::failed("a", 1, "x", 0.1)]);
        run.error = Some("Step 'b' panicked: kaboom".into());
        let report = ExecutionReport::new(&run, &Context::new());
        assert_eq!(
            report.error_summary.as_deref(),
            Some("a: x; Step 'b' panicked: kaboom")
        );
    }

    #[test]
    fn test_export_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let run = outcome(RunState::Completed, vec![]);

        ExecutionReport::new(&run, &Context::new()).export(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["execution_summary"]["state"], json!("completed"));
    }
}
