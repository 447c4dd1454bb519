//! Test assertions for run outcomes and step results.

use crate::core::RunState;
use crate::pipeline::RunOutcome;
use crate::steps::StepResult;

/// Asserts that the run finished in `expected`.
pub fn assert_run_state(outcome: &RunOutcome, expected: RunState) {
    assert_eq!(
        outcome.state, expected,
        "Expected run state {expected}, got {} (error: {:?})",
        outcome.state, outcome.error
    );
}

/// Asserts that the run completed.
pub fn assert_run_completed(outcome: &RunOutcome) {
    assert_run_state(outcome, RunState::Completed);
}

/// Returns the result for `step`, panicking if it did not run.
pub fn step_result<'a>(outcome: &'a RunOutcome, step: &str) -> &'a StepResult {
    outcome.result(step).unwrap_or_else(|| {
        panic!(
            "Expected step '{step}' to have run; ran: {:?}",
            ran_steps(outcome)
        )
    })
}

/// Asserts that `step` ran and succeeded.
pub fn assert_step_succeeded(outcome: &RunOutcome, step: &str) {
    let result = step_result(outcome, step);
    assert!(
        result.success,
        "Expected step '{step}' to succeed, got exit code {} ({:?})",
        result.exit_code, result.error_message
    );
}

/// Asserts that `step` ran and failed with `exit_code`.
pub fn assert_step_failed(outcome: &RunOutcome, step: &str, exit_code: i32) {
    let result = step_result(outcome, step);
    assert!(!result.success, "Expected step '{step}' to fail");
    assert_eq!(
        result.exit_code, exit_code,
        "Unexpected exit code for step '{step}'"
    );
}

/// Asserts that `step` never ran.
pub fn assert_step_not_run(outcome: &RunOutcome, step: &str) {
    assert!(
        outcome.result(step).is_none(),
        "Expected step '{step}' not to run"
    );
    assert!(
        outcome.skipped.iter().any(|name| name == step),
        "Expected step '{step}' to be listed as skipped; skipped: {:?}",
        outcome.skipped
    );
}

/// Asserts the exact list of steps that ran, in result order.
pub fn assert_ran_steps(outcome: &RunOutcome, expected: &[&str]) {
    assert_eq!(ran_steps(outcome), expected, "Unexpected steps in results");
}

fn ran_steps(outcome: &RunOutcome) -> Vec<&str> {
    outcome
        .results
        .iter()
        .map(|result| result.step_name.as_str())
        .collect()
}
