//! Recipe scheduler.
//!
//! Runs step definitions against a shared [`Context`], either one at a time
//! in dependency order (fail-fast) or concurrently with each step submitted
//! only once its dependencies have succeeded.

use super::{spec::assign_indices, DependencyGraph, RollbackPolicy, SchedulerConfig, StepDefinition};
use crate::cancellation::CancellationToken;
use crate::context::{Context, StepContext};
use crate::core::{RunEvent, RunState};
use crate::errors::{DependencyValidationError, Framework0Error, ResolutionError};
use crate::events::{EventSink, NoOpEventSink};
use crate::pipeline::retry::{with_retry, RetryPolicy};
use crate::steps::{exit_code_for, StepRegistry, StepResult};
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub use crate::steps::RESOLUTION_FAILURE_EXIT_CODE;

/// Exit code recorded for steps still running when the run deadline passes.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Label of the snapshot taken before the first step runs.
pub const PRE_EXECUTION_SNAPSHOT: &str = "pre_execution";

/// Identity that context restores after an aborted run are attributed to.
pub const ERROR_RECOVERY_IDENTITY: &str = "error_recovery";

/// The outcome of one scheduler run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    /// Unique id of the run.
    pub run_id: Uuid,
    /// Final run state.
    pub state: RunState,
    /// Results of every step that ran, ordered by step index.
    pub results: Vec<StepResult>,
    /// Steps that were never invoked, in declaration order.
    pub skipped: Vec<String>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the run in seconds.
    pub duration: f64,
    /// Why the run did not complete, if it did not.
    pub error: Option<String>,
    /// Whether the context was restored to its pre-execution state.
    pub rolled_back: bool,
}

impl RunOutcome {
    /// Returns true if the run completed with every step succeeding.
    #[must_use]
    pub fn success(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Returns the results of failed steps.
    pub fn failed_results(&self) -> impl Iterator<Item = &StepResult> {
        self.results.iter().filter(|result| !result.success)
    }

    /// Returns the result for `step`, if it ran.
    #[must_use]
    pub fn result(&self, step: &str) -> Option<&StepResult> {
        self.results.iter().find(|result| result.step_name == step)
    }
}

/// Executes recipes against a shared context.
pub struct Scheduler {
    registry: Arc<StepRegistry>,
    config: SchedulerConfig,
    event_sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    /// Creates a scheduler that resolves steps from `registry`.
    #[must_use]
    pub fn new(registry: Arc<StepRegistry>, config: SchedulerConfig) -> Self {
        Self {
            registry,
            config,
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the sink that receives run events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns the step registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<StepRegistry> {
        &self.registry
    }

    /// Applies filters and validation and returns the execution order.
    ///
    /// # Errors
    ///
    /// Returns the validation error that would fail the run.
    pub fn plan(&self, steps: Vec<StepDefinition>) -> Result<Vec<String>, DependencyValidationError> {
        let steps = apply_filters(steps, &self.config.only, &self.config.skip);
        validate_steps(&steps, true)
    }

    /// Runs `steps` against `context`.
    ///
    /// Validation failures, step failures and harness failures are reported
    /// through the returned [`RunOutcome`].
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the context
    /// rejects the rollback restore.
    pub async fn run(
        &self,
        steps: Vec<StepDefinition>,
        context: Arc<Context>,
    ) -> Result<RunOutcome, Framework0Error> {
        self.config.validate()?;

        let started_at = Utc::now();
        let start = Instant::now();
        let mut tracker = RunTracker::new(self.event_sink.clone());
        let run_id = tracker.run_id;

        let mut steps = steps;
        assign_indices(&mut steps);
        let steps = apply_filters(steps, &self.config.only, &self.config.skip);

        info!(
            run_id = %run_id,
            steps = steps.len(),
            parallel = self.config.parallel,
            "Starting recipe run"
        );
        self.event_sink
            .emit(RunEvent::run_started(run_id, steps.len(), self.config.parallel))
            .await;

        let order = match validate_steps(&steps, self.config.validate_dependencies) {
            Ok(order) => order,
            Err(err) => {
                error!(run_id = %run_id, error = %err, code = ?err.code(), "Recipe validation failed");
                tracker.transition(RunState::Failed).await?;
                let outcome = RunOutcome {
                    run_id,
                    state: tracker.state,
                    results: Vec::new(),
                    skipped: steps.iter().map(|s| s.name.clone()).collect(),
                    started_at,
                    duration: start.elapsed().as_secs_f64(),
                    error: Some(err.to_string()),
                    rolled_back: false,
                };
                self.finish(&outcome).await;
                return Ok(outcome);
            }
        };

        tracker.transition(RunState::Validated).await?;
        let snapshot = context.create_snapshot(PRE_EXECUTION_SNAPSHOT);
        tracker.transition(RunState::Executing).await?;

        let env = StepEnv {
            run_id,
            registry: self.registry.clone(),
            context: context.clone(),
            sink: self.event_sink.clone(),
            retry: self.config.resolution_retry,
            cancellation: Arc::new(CancellationToken::new()),
        };
        // A timeout too far out to represent as an instant means no deadline.
        let deadline = self
            .config
            .timeout()
            .and_then(|timeout| tokio::time::Instant::now().checked_add(timeout));

        let progress = if self.config.parallel {
            self.run_parallel(&env, &steps, deadline).await
        } else {
            run_sequential(&env, &steps, &order, deadline).await
        };

        let failed: Vec<&str> = progress
            .results
            .iter()
            .filter(|result| !result.success)
            .map(|result| result.step_name.as_str())
            .collect();
        let (state, error) = if let Some(harness) = &progress.harness_error {
            (RunState::Aborted, Some(harness.clone()))
        } else if !failed.is_empty() {
            (RunState::Failed, Some(format!("Failed steps: {}", failed.join(", "))))
        } else if progress.timed_out {
            (RunState::Failed, Some("Run exceeded its timeout".to_string()))
        } else {
            (RunState::Completed, None)
        };

        let rollback = match self.config.rollback {
            RollbackPolicy::Never => false,
            RollbackPolicy::OnAbort => state == RunState::Aborted,
            RollbackPolicy::OnFailure => state != RunState::Completed,
        };
        if rollback {
            context.restore_snapshot(&snapshot, ERROR_RECOVERY_IDENTITY)?;
            let reason = error.clone().unwrap_or_default();
            warn!(run_id = %run_id, reason = %reason, "Context rolled back to pre-execution snapshot");
            self.event_sink.emit(RunEvent::rolled_back(run_id, &reason)).await;
        } else {
            context.discard_snapshot(&snapshot);
        }

        tracker.transition(state).await?;

        let index: HashMap<&str, usize> = steps
            .iter()
            .map(|step| (step.name.as_str(), step.idx.unwrap_or(usize::MAX)))
            .collect();
        let mut results = progress.results;
        results.sort_by_key(|result| index.get(result.step_name.as_str()).copied().unwrap_or(usize::MAX));

        let started: HashSet<&str> = results.iter().map(|r| r.step_name.as_str()).collect();
        let skipped = steps
            .iter()
            .filter(|step| !started.contains(step.name.as_str()))
            .map(|step| step.name.clone())
            .collect();

        let outcome = RunOutcome {
            run_id,
            state,
            results,
            skipped,
            started_at,
            duration: start.elapsed().as_secs_f64(),
            error,
            rolled_back: rollback,
        };
        self.finish(&outcome).await;
        Ok(outcome)
    }

    async fn finish(&self, outcome: &RunOutcome) {
        info!(
            run_id = %outcome.run_id,
            state = %outcome.state,
            steps_run = outcome.results.len(),
            skipped = outcome.skipped.len(),
            duration = outcome.duration,
            "Recipe run finished"
        );
        self.event_sink
            .emit(RunEvent::run_completed(outcome.run_id, outcome.state, outcome.duration))
            .await;
    }

    async fn run_parallel(
        &self,
        env: &StepEnv,
        steps: &[StepDefinition],
        deadline: Option<tokio::time::Instant>,
    ) -> Progress {
        let by_name: HashMap<&str, &StepDefinition> =
            steps.iter().map(|step| (step.name.as_str(), step)).collect();

        // Only edges between steps of this run gate submission.
        let mut in_degree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for step in steps {
            let deps: BTreeSet<&str> = step
                .depends_on
                .iter()
                .map(String::as_str)
                .filter(|dep| by_name.contains_key(dep))
                .collect();
            in_degree.insert(step.name.as_str(), deps.len());
            for dep in deps {
                dependents.entry(dep).or_default().push(step.name.as_str());
            }
        }

        let mut ready: VecDeque<&StepDefinition> = steps
            .iter()
            .filter(|step| in_degree.get(step.name.as_str()) == Some(&0))
            .collect();
        let mut active = FuturesUnordered::new();
        let mut in_flight: HashMap<String, (AbortHandle, Instant)> = HashMap::new();
        let mut progress = Progress::default();
        let mut failed: HashSet<String> = HashSet::new();
        let max_workers = self.config.max_workers.max(1);

        loop {
            while in_flight.len() < max_workers
                && !env.cancellation.is_cancelled()
                && progress.harness_error.is_none()
            {
                let Some(step) = ready.pop_front() else { break };
                let (abort, task) = spawn_step(env, step);
                in_flight.insert(step.name.clone(), (abort, Instant::now()));
                active.push(task);
            }

            if active.is_empty() {
                break;
            }

            let next = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, active.next()).await {
                    Ok(next) => next,
                    Err(_) => {
                        env.cancellation.cancel("run timeout exceeded");
                        progress.timed_out = true;
                        for (name, (abort, step_start)) in in_flight.drain() {
                            abort.abort();
                            warn!(run_id = %env.run_id, step = %name, "Step exceeded run timeout");
                            progress.results.push(timeout_result(&name, step_start));
                        }
                        break;
                    }
                },
                None => active.next().await,
            };
            let Some((name, joined)) = next else { break };
            in_flight.remove(&name);

            match joined {
                Ok(result) => {
                    if result.success {
                        for dependent in dependents.get(name.as_str()).into_iter().flatten() {
                            if let Some(count) = in_degree.get_mut(dependent) {
                                *count = count.saturating_sub(1);
                                if *count == 0 {
                                    if let Some(step) = by_name.get(dependent) {
                                        ready.push_back(*step);
                                    }
                                }
                            }
                        }
                    } else {
                        failed.insert(name.clone());
                        if self.config.is_critical(&name) {
                            let reason = format!("critical step '{name}' failed");
                            warn!(run_id = %env.run_id, step = %name, "Critical step failed, cancelling pending steps");
                            env.cancellation.cancel(reason);
                        }
                    }
                    progress.results.push(result);
                }
                Err(join_error) => {
                    let message = describe_join_error(&name, join_error);
                    error!(run_id = %env.run_id, step = %name, error = %message, "Step harness failure");
                    env.cancellation.cancel(message.clone());
                    if progress.harness_error.is_none() {
                        progress.harness_error = Some(message);
                    }
                }
            }
        }

        if progress.harness_error.is_none() && !progress.timed_out && !env.cancellation.is_cancelled() {
            if let Some(stuck) = find_deadlock(steps, &progress, &failed) {
                let message = format!("Deadlocked step graph; remaining steps: {}", stuck.join(", "));
                error!(run_id = %env.run_id, "{message}");
                progress.harness_error = Some(message);
            }
        }
        progress
    }
}

/// Shared state every step invocation needs.
#[derive(Clone)]
struct StepEnv {
    run_id: Uuid,
    registry: Arc<StepRegistry>,
    context: Arc<Context>,
    sink: Arc<dyn EventSink>,
    retry: RetryPolicy,
    cancellation: Arc<CancellationToken>,
}

/// What execution produced before the run state is decided.
#[derive(Debug, Default)]
struct Progress {
    results: Vec<StepResult>,
    timed_out: bool,
    harness_error: Option<String>,
}

/// Tracks and publishes run state transitions.
struct RunTracker {
    run_id: Uuid,
    state: RunState,
    sink: Arc<dyn EventSink>,
}

impl RunTracker {
    fn new(sink: Arc<dyn EventSink>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Loaded,
            sink,
        }
    }

    async fn transition(&mut self, next: RunState) -> Result<(), Framework0Error> {
        if !self.state.can_transition_to(next) {
            return Err(Framework0Error::Internal(format!(
                "illegal run state transition {} -> {next}",
                self.state
            )));
        }
        debug!(run_id = %self.run_id, from = %self.state, to = %next, "Run state changed");
        self.sink
            .emit(RunEvent::state_changed(self.run_id, self.state, next))
            .await;
        self.state = next;
        Ok(())
    }
}

async fn run_sequential(
    env: &StepEnv,
    steps: &[StepDefinition],
    order: &[String],
    deadline: Option<tokio::time::Instant>,
) -> Progress {
    let by_name: HashMap<&str, &StepDefinition> =
        steps.iter().map(|step| (step.name.as_str(), step)).collect();
    let mut progress = Progress::default();

    for name in order {
        let Some(step) = by_name.get(name.as_str()) else { continue };
        if deadline.is_some_and(|deadline| tokio::time::Instant::now() >= deadline) {
            progress.timed_out = true;
            break;
        }

        let step_start = Instant::now();
        let mut handle = tokio::spawn(execute_step(env.clone(), (*step).clone()));
        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout_at(deadline, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    handle.abort();
                    env.cancellation.cancel("run timeout exceeded");
                    warn!(run_id = %env.run_id, step = %name, "Step exceeded run timeout");
                    progress.results.push(timeout_result(name, step_start));
                    progress.timed_out = true;
                    break;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(result) => {
                let success = result.success;
                progress.results.push(result);
                if !success {
                    info!(run_id = %env.run_id, step = %name, "Step failed, stopping sequential run");
                    break;
                }
            }
            Err(join_error) => {
                let message = describe_join_error(name, join_error);
                error!(run_id = %env.run_id, step = %name, error = %message, "Step harness failure");
                progress.harness_error = Some(message);
                break;
            }
        }
    }
    progress
}

fn spawn_step(
    env: &StepEnv,
    step: &StepDefinition,
) -> (AbortHandle, impl Future<Output = (String, Result<StepResult, JoinError>)>) {
    let name = step.name.clone();
    let handle = tokio::spawn(execute_step(env.clone(), step.clone()));
    let abort = handle.abort_handle();
    (abort, async move { (name, handle.await) })
}

/// Resolves, runs and records a single step. Never fails: every problem
/// below a panic becomes a failed `StepResult`.
async fn execute_step(env: StepEnv, step: StepDefinition) -> StepResult {
    let start = Instant::now();
    let name = step.name.as_str();
    env.sink.emit(RunEvent::step_started(env.run_id, name)).await;
    debug!(run_id = %env.run_id, step = %name, key = %step.registry_key(), "Resolving step");

    let key = step.registry_key();
    let resolved = with_retry(
        &env.retry,
        || {
            let registry = env.registry.clone();
            let key = key.clone();
            async move { registry.resolve(&key) }
        },
        |attempt, err: &ResolutionError| {
            warn!(run_id = %env.run_id, step = %name, attempt, error = %err, "Step resolution failed, retrying");
            env.sink
                .try_emit(RunEvent::resolution_retry(env.run_id, name, attempt, &err.to_string()));
        },
    )
    .await;

    let implementation = match resolved {
        Ok(implementation) => implementation,
        Err(err) => {
            let result = StepResult::failed(
                name,
                RESOLUTION_FAILURE_EXIT_CODE,
                err.to_string(),
                start.elapsed().as_secs_f64(),
            );
            report_step(&env, &result).await;
            return result;
        }
    };

    let keys_before = env.context.keys();
    let step_ctx = StepContext::new(env.context.clone(), name, step.args.clone())
        .with_cancellation(env.cancellation.clone());
    let outcome = implementation.run(&step_ctx).await;
    let keys_after = env.context.keys();
    let changes: Vec<String> = keys_after.difference(&keys_before).cloned().collect();
    let duration = start.elapsed().as_secs_f64();

    let result = match outcome {
        Ok(0) => StepResult::succeeded(name, duration, changes),
        Ok(code) => StepResult::failed(name, code, format!("Step exited with code {code}"), duration)
            .with_context_changes(changes),
        Err(err) => StepResult::failed(name, exit_code_for(&err), format!("{err:#}"), duration)
            .with_context_changes(changes),
    };
    report_step(&env, &result).await;
    result
}

async fn report_step(env: &StepEnv, result: &StepResult) {
    if result.success {
        debug!(run_id = %env.run_id, step = %result.step_name, duration = result.duration, "Step completed");
        env.sink
            .emit(RunEvent::step_completed(env.run_id, &result.step_name, result.duration))
            .await;
    } else {
        warn!(
            run_id = %env.run_id,
            step = %result.step_name,
            exit_code = result.exit_code,
            error = ?result.error_message,
            "Step failed"
        );
        env.sink
            .emit(RunEvent::step_failed(
                env.run_id,
                &result.step_name,
                result.exit_code,
                result.error_message.as_deref(),
            ))
            .await;
    }
}

fn timeout_result(name: &str, step_start: Instant) -> StepResult {
    StepResult::failed(
        name,
        TIMEOUT_EXIT_CODE,
        "exceeded run timeout",
        step_start.elapsed().as_secs_f64(),
    )
}

fn describe_join_error(name: &str, join_error: JoinError) -> String {
    if join_error.is_panic() {
        let payload = join_error.into_panic();
        let detail = payload
            .downcast_ref::<&str>()
            .map(ToString::to_string)
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        format!("Step '{name}' panicked: {detail}")
    } else {
        format!("Step '{name}' task failed: {join_error}")
    }
}

/// Returns steps that never ran although nothing upstream failed.
fn find_deadlock(steps: &[StepDefinition], progress: &Progress, failed: &HashSet<String>) -> Option<Vec<String>> {
    let ran: HashSet<&str> = progress.results.iter().map(|r| r.step_name.as_str()).collect();
    let mut blocked: HashSet<&str> = failed.iter().map(String::as_str).collect();
    let pending: Vec<&StepDefinition> = steps
        .iter()
        .filter(|step| !ran.contains(step.name.as_str()))
        .collect();

    loop {
        let before = blocked.len();
        for step in &pending {
            if step.depends_on.iter().any(|dep| blocked.contains(dep.as_str())) {
                blocked.insert(step.name.as_str());
            }
        }
        if blocked.len() == before {
            break;
        }
    }

    let stuck: Vec<String> = pending
        .iter()
        .filter(|step| !blocked.contains(step.name.as_str()))
        .map(|step| step.name.clone())
        .collect();
    (!stuck.is_empty()).then_some(stuck)
}

/// Applies `only`/`skip` filters and drops dependencies on removed steps.
pub(crate) fn apply_filters(
    steps: Vec<StepDefinition>,
    only: &[String],
    skip: &[String],
) -> Vec<StepDefinition> {
    if only.is_empty() && skip.is_empty() {
        return steps;
    }
    for name in only.iter().chain(skip) {
        if !steps.iter().any(|step| &step.name == name) {
            warn!(step = %name, "Filter names a step that is not in the recipe");
        }
    }

    let kept: Vec<StepDefinition> = steps
        .into_iter()
        .filter(|step| only.is_empty() || only.contains(&step.name))
        .filter(|step| !skip.contains(&step.name))
        .collect();
    let names: HashSet<String> = kept.iter().map(|step| step.name.clone()).collect();

    kept.into_iter()
        .map(|mut step| {
            step.depends_on.retain(|dep| names.contains(dep));
            step
        })
        .collect()
}

/// Checks step definitions and returns the execution order.
///
/// Without `check_graph` the declared order is returned and dependencies
/// are not inspected.
pub(crate) fn validate_steps(
    steps: &[StepDefinition],
    check_graph: bool,
) -> Result<Vec<String>, DependencyValidationError> {
    let mut seen = HashSet::new();
    for step in steps {
        step.validate()?;
        if !seen.insert(step.name.as_str()) {
            return Err(DependencyValidationError::duplicate_step(&step.name));
        }
    }

    if !check_graph {
        return Ok(steps.iter().map(|step| step.name.clone()).collect());
    }

    let mut graph = DependencyGraph::new();
    for step in steps {
        graph.add_task(step.name.clone(), step.depends_on.iter().cloned());
    }
    Ok(graph.get_task_order()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, deps: &[&str]) -> StepDefinition {
        StepDefinition::new(name, "util", "log").with_dependencies(deps.iter().copied())
    }

    #[test]
    fn test_filters_drop_dangling_dependencies() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["b", "a"])];
        let filtered = apply_filters(steps, &[], &["a".to_string()]);

        let names: Vec<_> = filtered.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert!(filtered[0].depends_on.is_empty());
        assert_eq!(filtered[1].depends_on, vec!["b"]);
    }

    #[test]
    fn test_only_filter() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &[])];
        let filtered = apply_filters(steps, &["b".to_string(), "c".to_string()], &[]);
        let names: Vec<_> = filtered.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
    }

    #[test]
    fn test_validate_steps_errors() {
        let dup = vec![step("a", &[]), step("a", &[])];
        assert_eq!(validate_steps(&dup, true).unwrap_err().code(), Some("RECIPE-DUPLICATE"));

        let cycle = vec![step("a", &["b"]), step("b", &["a"])];
        assert_eq!(validate_steps(&cycle, true).unwrap_err().code(), Some("RECIPE-CYCLE"));
        assert_eq!(validate_steps(&cycle, false).unwrap(), vec!["a", "b"]);

        let missing = vec![step("a", &["ghost"])];
        assert_eq!(
            validate_steps(&missing, true).unwrap_err().code(),
            Some("RECIPE-MISSING_DEP")
        );
    }

    #[test]
    fn test_find_deadlock_ignores_steps_behind_failures() {
        let steps = vec![step("a", &[]), step("b", &["a"]), step("c", &["b"])];
        let progress = Progress {
            results: vec![StepResult::failed("a", 1, "x", 0.0)],
            ..Progress::default()
        };
        let failed = HashSet::from(["a".to_string()]);
        assert_eq!(find_deadlock(&steps, &progress, &failed), None);

        let cyclic = vec![step("x", &["y"]), step("y", &["x"])];
        assert_eq!(
            find_deadlock(&cyclic, &Progress::default(), &HashSet::new()),
            Some(vec!["x".to_string(), "y".to_string()])
        );
    }

    #[tokio::test]
    async fn test_panic_payload_is_reported() {
        let handle = tokio::spawn(async { panic!("kaboom") });
        let err = handle.await.unwrap_err();
        assert_eq!(describe_join_error("s", err), "Step 's' panicked: kaboom");
    }
}
