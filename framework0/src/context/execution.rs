//! The view of the shared context handed to a running step.

use super::Context;
use crate::cancellation::CancellationToken;
use crate::errors::ContextError;
use std::sync::Arc;

/// Step arguments as parsed from the recipe.
pub type StepArgs = serde_json::Map<String, serde_json::Value>;

/// Execution context for a single step invocation.
///
/// Writes made through [`StepContext::set`] are attributed to the step name.
/// The full [`Context`] API stays reachable through [`StepContext::context`].
#[derive(Debug, Clone)]
pub struct StepContext {
    context: Arc<Context>,
    step_name: String,
    args: StepArgs,
    cancellation: Arc<CancellationToken>,
}

impl StepContext {
    /// Creates a new step context.
    #[must_use]
    pub fn new(context: Arc<Context>, step_name: impl Into<String>, args: StepArgs) -> Self {
        Self {
            context,
            step_name: step_name.into(),
            args,
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Shares a run-wide cancellation token with this step.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the step name.
    #[must_use]
    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    /// Returns the shared context.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Returns all arguments.
    #[must_use]
    pub fn args(&self) -> &StepArgs {
        &self.args
    }

    /// Returns a single argument.
    #[must_use]
    pub fn arg(&self, name: &str) -> Option<&serde_json::Value> {
        self.args.get(name)
    }

    /// Returns a string argument.
    #[must_use]
    pub fn arg_str(&self, name: &str) -> Option<&str> {
        self.args.get(name).and_then(serde_json::Value::as_str)
    }

    /// Reads a context value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        self.context.get(key)
    }

    /// Writes a context value attributed to this step.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid.
    pub fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Result<(), ContextError> {
        self.context.set(key, value, &self.step_name)
    }

    /// Returns true once the run has been cancelled.
    ///
    /// Long-running steps should poll this and return early.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.cancellation.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> StepArgs {
        let mut map = StepArgs::new();
        map.insert("path".into(), json!("/tmp/x"));
        map.insert("count".into(), json!(3));
        map
    }

    #[test]
    fn test_writes_are_attributed_to_step() {
        let ctx = Arc::new(Context::new());
        let step_ctx = StepContext::new(ctx.clone(), "loader", args());

        step_ctx.set("data.rows", 10).unwrap();

        let history = ctx.get_history(None);
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].who, "loader");
        assert_eq!(step_ctx.get("data.rows"), Some(json!(10)));
    }

    #[test]
    fn test_arg_accessors() {
        let step_ctx = StepContext::new(Arc::new(Context::new()), "s", args());
        assert_eq!(step_ctx.arg_str("path"), Some("/tmp/x"));
        assert_eq!(step_ctx.arg("count"), Some(&json!(3)));
        assert_eq!(step_ctx.arg_str("count"), None);
        assert_eq!(step_ctx.args().len(), 2);
    }

    #[test]
    fn test_cancellation_is_shared() {
        let token = Arc::new(CancellationToken::new());
        let step_ctx = StepContext::new(Arc::new(Context::new()), "s", StepArgs::new())
            .with_cancellation(token.clone());
        assert!(!step_ctx.is_cancelled());
        token.cancel("critical step failed");
        assert!(step_ctx.is_cancelled());
    }
}
