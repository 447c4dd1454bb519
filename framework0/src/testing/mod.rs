//! Testing utilities for framework0 recipes.
//!
//! This module provides:
//! - Mock steps that record, fail, stall or panic
//! - Assertions over run outcomes
//! - A scheduler test harness

mod assertions;
mod fixtures;
mod mocks;

pub use assertions::{
    assert_ran_steps, assert_run_completed, assert_run_state, assert_step_failed,
    assert_step_not_run, assert_step_succeeded, step_result,
};
pub use fixtures::{TestHarness, TEST_MODULE};
pub use mocks::{
    FailingStep, InvocationLog, PanickingStep, RecordingStep, SlowStep, SuccessStep,
};
