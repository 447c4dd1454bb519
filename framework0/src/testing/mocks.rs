//! Mock steps for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::context::StepContext;
use crate::steps::{Step, INTERRUPTED_EXIT_CODE};

/// Shared log of step invocations.
///
/// Clones share the same log, so one log can be handed to every mock in a
/// recipe and inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct InvocationLog {
    events: Arc<Mutex<Vec<String>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl InvocationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, entry: impl Into<String>) {
        self.events.lock().push(entry.into());
    }

    /// Returns every entry in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    /// Returns the position of the first entry equal to `entry`.
    #[must_use]
    pub fn position(&self, entry: &str) -> Option<usize> {
        self.events.lock().iter().position(|e| e == entry)
    }

    /// Returns true if `entry` was recorded.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.position(entry).is_some()
    }

    /// Highest number of steps observed running at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A step that logs `<name>:start` and `<name>:end`, optionally waits,
/// and writes `<name>.done = true` into the context.
#[derive(Debug)]
pub struct RecordingStep {
    log: InvocationLog,
    delay: Duration,
    calls: AtomicUsize,
}

impl RecordingStep {
    /// Creates a recording step writing to `log`.
    #[must_use]
    pub fn new(log: InvocationLog) -> Self {
        Self {
            log,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Waits `delay` between the start and end entries.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of times the step ran.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Step for RecordingStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        let name = ctx.step_name();
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.enter();
        self.log.record(format!("{name}:start"));
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.log.record(format!("{name}:end"));
        self.log.exit();
        ctx.set(format!("{name}.done"), true)?;
        Ok(0)
    }

    fn description(&self) -> &str {
        "Record the invocation"
    }
}

/// A step that always succeeds without touching the context.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessStep;

#[async_trait]
impl Step for SuccessStep {
    async fn run(&self, _ctx: &StepContext) -> anyhow::Result<i32> {
        Ok(0)
    }
}

/// A step that always fails, either with an exit code or an error.
#[derive(Debug, Clone)]
pub struct FailingStep {
    exit_code: i32,
    error: Option<String>,
}

impl FailingStep {
    /// Fails by returning `exit_code`. Zero is bumped to 1.
    #[must_use]
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code: if exit_code == 0 { 1 } else { exit_code },
            error: None,
        }
    }

    /// Fails by returning an error with `message`.
    #[must_use]
    pub fn with_error(message: impl Into<String>) -> Self {
        Self {
            exit_code: 1,
            error: Some(message.into()),
        }
    }
}

#[async_trait]
impl Step for FailingStep {
    async fn run(&self, _ctx: &StepContext) -> anyhow::Result<i32> {
        match &self.error {
            Some(message) => Err(anyhow::anyhow!("{message}")),
            None => Ok(self.exit_code),
        }
    }
}

/// A step that sleeps, returning early with [`INTERRUPTED_EXIT_CODE`] if the
/// run is cancelled.
#[derive(Debug, Clone)]
pub struct SlowStep {
    delay: Duration,
}

impl SlowStep {
    /// Creates a slow step.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Creates a slow step with delay in milliseconds.
    #[must_use]
    pub fn with_delay_ms(ms: u64) -> Self {
        Self::new(Duration::from_millis(ms))
    }
}

#[async_trait]
impl Step for SlowStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        tokio::select! {
            () = tokio::time::sleep(self.delay) => Ok(0),
            () = ctx.cancelled() => Ok(INTERRUPTED_EXIT_CODE),
        }
    }
}

/// A step that writes `<name>.partial` and then panics.
#[derive(Debug, Clone)]
pub struct PanickingStep {
    message: String,
}

impl PanickingStep {
    /// Creates a panicking step.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl Step for PanickingStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        ctx.set(format!("{}.partial", ctx.step_name()), true)?;
        panic!("{}", self.message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::context::{Context, StepArgs};

    fn step_ctx(name: &str) -> StepContext {
        StepContext::new(Arc::new(Context::new()), name, StepArgs::new())
    }

    #[tokio::test]
    async fn test_recording_step() {
        let log = InvocationLog::new();
        let step = RecordingStep::new(log.clone());
        let ctx = step_ctx("load");

        assert_eq!(step.run(&ctx).await.unwrap(), 0);
        assert_eq!(step.call_count(), 1);
        assert_eq!(log.entries(), vec!["load:start", "load:end"]);
        assert_eq!(ctx.get("load.done"), Some(serde_json::json!(true)));
        assert_eq!(log.peak_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_failing_step_variants() {
        let ctx = step_ctx("f");
        assert_eq!(FailingStep::with_exit_code(4).run(&ctx).await.unwrap(), 4);
        assert_eq!(FailingStep::with_exit_code(0).run(&ctx).await.unwrap(), 1);
        let err = FailingStep::with_error("boom").run(&ctx).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_slow_step_interrupted() {
        let token = Arc::new(CancellationToken::new());
        token.cancel("stop");
        let ctx = step_ctx("slow").with_cancellation(token);
        let code = SlowStep::with_delay_ms(10_000).run(&ctx).await.unwrap();
        assert_eq!(code, INTERRUPTED_EXIT_CODE);
    }
}
