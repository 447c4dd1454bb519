//! Test fixtures for scheduler testing.

use std::sync::Arc;

use crate::context::Context;
use crate::errors::Framework0Error;
use crate::events::CollectingEventSink;
use crate::pipeline::{RunOutcome, Scheduler, SchedulerConfig, StepDefinition};
use crate::steps::{Step, StepRegistry};

/// Module name under which [`TestHarness::register`] stores steps.
pub const TEST_MODULE: &str = "test";

/// Bundles a registry, a collecting sink and a fresh context.
#[derive(Debug)]
pub struct TestHarness {
    /// Registry steps are resolved from.
    pub registry: Arc<StepRegistry>,
    /// Sink capturing every run event.
    pub events: Arc<CollectingEventSink>,
    /// Context the run executes against.
    pub context: Arc<Context>,
    /// Scheduler configuration.
    pub config: SchedulerConfig,
}

impl TestHarness {
    /// Creates a harness with an empty registry and the default config.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(StepRegistry::new()),
            events: Arc::new(CollectingEventSink::new()),
            context: Arc::new(Context::new()),
            config: SchedulerConfig::default(),
        }
    }

    /// Replaces the scheduler configuration.
    #[must_use]
    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    /// Registers `step` as `test.<function>`.
    pub fn register(&self, function: &str, step: impl Step + 'static) {
        self.registry.register(format!("{TEST_MODULE}.{function}"), step);
    }

    /// Registers a shared step as `test.<function>`.
    pub fn register_arc(&self, function: &str, step: Arc<dyn Step>) {
        self.registry.register_arc(format!("{TEST_MODULE}.{function}"), step);
    }

    /// Builds a step definition calling `test.<function>`.
    #[must_use]
    pub fn step(name: &str, function: &str, deps: &[&str]) -> StepDefinition {
        StepDefinition::new(name, TEST_MODULE, function).with_dependencies(deps.iter().copied())
    }

    /// Builds a scheduler wired to this harness.
    #[must_use]
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.registry.clone(), self.config.clone())
            .with_event_sink(self.events.clone())
    }

    /// Runs `steps` against the harness context.
    pub async fn run(&self, steps: Vec<StepDefinition>) -> Result<RunOutcome, Framework0Error> {
        self.scheduler().run(steps, self.context.clone()).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
