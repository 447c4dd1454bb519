//! Step trait and implementations.
//!
//! Steps are the units of work a recipe schedules. A step reads and writes
//! the shared context and reports an exit code: `Ok(0)` is success, any
//! other `Ok(n)` fails with exit code `n`, and `Err` fails with exit code 1.

mod builtin;
mod registry;
mod result;

pub use builtin::{ContextCopyStep, ContextSetStep, FailStep, LogStep, SleepStep};
pub use registry::{registry_key, StepFactory, StepRegistry};
pub use result::{
    exit_code_for, StepFailure, StepResult, INTERRUPTED_EXIT_CODE, RESOLUTION_FAILURE_EXIT_CODE,
};

use crate::context::StepContext;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

/// A unit of work in a recipe.
#[async_trait]
pub trait Step: Send + Sync + Debug {
    /// Runs the step and returns its exit code.
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32>;

    /// One-line description shown by step listings.
    fn description(&self) -> &str {
        ""
    }
}

/// A step backed by a synchronous closure.
pub struct FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<i32> + Send + Sync,
{
    description: String,
    func: F,
}

impl<F> FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<i32> + Send + Sync,
{
    /// Creates a new function-based step.
    pub fn new(func: F) -> Self {
        Self {
            description: String::new(),
            func,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl<F> Debug for FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<i32> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStep")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Step for FnStep<F>
where
    F: Fn(&StepContext) -> anyhow::Result<i32> + Send + Sync,
{
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        (self.func)(ctx)
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// A step backed by an async closure taking an owned context.
pub struct AsyncFnStep<F, Fut>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<i32>> + Send,
{
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnStep<F, Fut>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<i32>> + Send,
{
    /// Creates a new async function-based step.
    pub fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for AsyncFnStep<F, Fut>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<i32>> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnStep").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> Step for AsyncFnStep<F, Fut>
where
    F: Fn(StepContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<i32>> + Send,
{
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        (self.func)(ctx.clone()).await
    }
}
