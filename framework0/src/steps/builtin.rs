//! Built-in steps available to every recipe.

use super::{Step, StepFailure, StepRegistry, INTERRUPTED_EXIT_CODE};
use crate::context::StepContext;
use anyhow::{anyhow, Context as _};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

pub(crate) fn register_builtins(registry: &StepRegistry) {
    registry.register("context.set", ContextSetStep);
    registry.register("context.copy", ContextCopyStep);
    registry.register("util.sleep", SleepStep);
    registry.register("util.log", LogStep);
    registry.register("util.fail", FailStep);
}

/// Writes every argument as a context key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextSetStep;

#[async_trait]
impl Step for ContextSetStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        for (key, value) in ctx.args() {
            ctx.set(key.clone(), value.clone())?;
        }
        Ok(0)
    }

    fn description(&self) -> &str {
        "Write each argument into the context"
    }
}

/// Copies the value at `from` to `to`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextCopyStep;

#[async_trait]
impl Step for ContextCopyStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        let from = ctx.arg_str("from").context("missing 'from' argument")?;
        let to = ctx.arg_str("to").context("missing 'to' argument")?;
        let value = ctx
            .get(from)
            .ok_or_else(|| anyhow!("context key '{from}' is not set"))?;
        ctx.set(to, value)?;
        Ok(0)
    }

    fn description(&self) -> &str {
        "Copy the context value at 'from' to 'to'"
    }
}

/// Sleeps for `ms` milliseconds. Cancellation cuts the sleep short and
/// fails the step with [`INTERRUPTED_EXIT_CODE`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SleepStep;

#[async_trait]
impl Step for SleepStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        let ms = ctx
            .arg("ms")
            .and_then(serde_json::Value::as_u64)
            .context("'ms' must be a non-negative integer")?;
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(ms)) => Ok(0),
            () = ctx.cancelled() => {
                warn!(step = %ctx.step_name(), "Sleep interrupted by cancellation");
                Ok(INTERRUPTED_EXIT_CODE)
            }
        }
    }

    fn description(&self) -> &str {
        "Sleep for 'ms' milliseconds"
    }
}

/// Logs `message` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogStep;

#[async_trait]
impl Step for LogStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        let message = ctx.arg_str("message").unwrap_or_default();
        info!(step = %ctx.step_name(), "{message}");
        Ok(0)
    }

    fn description(&self) -> &str {
        "Log 'message'"
    }
}

/// Fails with `exit_code` (default 1) and the optional `message`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailStep;

#[async_trait]
impl Step for FailStep {
    async fn run(&self, ctx: &StepContext) -> anyhow::Result<i32> {
        let exit_code = ctx
            .arg("exit_code")
            .and_then(serde_json::Value::as_i64)
            .and_then(|code| i32::try_from(code).ok())
            .unwrap_or(1);
        match ctx.arg_str("message") {
            Some(message) => Err(StepFailure::new(exit_code, message).into()),
            None => Ok(if exit_code == 0 { 1 } else { exit_code }),
        }
    }

    fn description(&self) -> &str {
        "Fail with 'exit_code' (default 1)"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::context::{Context, StepArgs};
    use serde_json::json;
    use std::sync::Arc;

    fn step_ctx(ctx: &Arc<Context>, args: serde_json::Value) -> StepContext {
        let args: StepArgs = serde_json::from_value(args).unwrap();
        StepContext::new(ctx.clone(), "builtin", args)
    }

    #[tokio::test]
    async fn test_context_set_writes_args() {
        let ctx = Arc::new(Context::new());
        let code = ContextSetStep
            .run(&step_ctx(&ctx, json!({"config.mode": "fast", "config.level": 3})))
            .await
            .unwrap();
        assert_eq!(code, 0);
        assert_eq!(ctx.get("config.mode"), Some(json!("fast")));
        assert!(ctx.get_history(None).iter().all(|r| r.who == "builtin"));
    }

    #[tokio::test]
    async fn test_context_set_rejects_bad_key() {
        let ctx = Arc::new(Context::new());
        let result = ContextSetStep.run(&step_ctx(&ctx, json!({"a..b": 1}))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_context_copy() {
        let ctx = Arc::new(Context::new());
        ctx.set("src.value", json!([1, 2]), "seed").unwrap();

        ContextCopyStep
            .run(&step_ctx(&ctx, json!({"from": "src.value", "to": "dst.value"})))
            .await
            .unwrap();
        assert_eq!(ctx.get("dst.value"), Some(json!([1, 2])));

        let err = ContextCopyStep
            .run(&step_ctx(&ctx, json!({"from": "nope", "to": "x"})))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope"));
    }

    #[tokio::test]
    async fn test_sleep_requires_ms_and_honours_cancellation() {
        let ctx = Arc::new(Context::new());
        assert!(SleepStep.run(&step_ctx(&ctx, json!({}))).await.is_err());

        let token = Arc::new(CancellationToken::new());
        token.cancel("stop");
        let cancelled = step_ctx(&ctx, json!({"ms": 60_000})).with_cancellation(token);
        let result = tokio::time::timeout(Duration::from_secs(1), SleepStep.run(&cancelled)).await;
        assert_eq!(result.unwrap().unwrap(), INTERRUPTED_EXIT_CODE);

        assert_eq!(SleepStep.run(&step_ctx(&ctx, json!({"ms": 1}))).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_fail_step_exit_codes() {
        let ctx = Arc::new(Context::new());
        assert_eq!(FailStep.run(&step_ctx(&ctx, json!({}))).await.unwrap(), 1);
        assert_eq!(FailStep.run(&step_ctx(&ctx, json!({"exit_code": 3}))).await.unwrap(), 3);
        assert_eq!(FailStep.run(&step_ctx(&ctx, json!({"exit_code": 0}))).await.unwrap(), 1);

        let err = FailStep
            .run(&step_ctx(&ctx, json!({"message": "bad input"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "bad input");
        assert_eq!(crate::steps::exit_code_for(&err), 1);

        let err = FailStep
            .run(&step_ctx(&ctx, json!({"exit_code": 3, "message": "quota exceeded"})))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(crate::steps::exit_code_for(&err), 3);
    }

    #[tokio::test]
    async fn test_log_step() {
        let ctx = Arc::new(Context::new());
        assert_eq!(LogStep.run(&step_ctx(&ctx, json!({"message": "hi"}))).await.unwrap(), 0);
    }
}
