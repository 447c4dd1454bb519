//! Event sink trait and implementations.

use crate::core::RunEvent;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, info, Level};

/// Receives run lifecycle events.
///
/// Implementations must not fail; sinks swallow and log their own errors.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Emits an event.
    async fn emit(&self, event: RunEvent);

    /// Emits an event without awaiting.
    fn try_emit(&self, event: RunEvent);
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: RunEvent) {}

    fn try_emit(&self, _event: RunEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self { level: Level::INFO }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink with the specified level.
    #[must_use]
    pub fn new(level: Level) -> Self {
        Self { level }
    }

    /// Creates a debug-level logging sink.
    #[must_use]
    pub fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    fn log_event(&self, event: &RunEvent) {
        let data = serde_json::Value::Object(event.data.clone());
        if self.level == Level::DEBUG {
            debug!(
                event_type = %event.event_type,
                run_id = %event.run_id,
                event_data = %data,
                "Event: {}", event.event_type
            );
        } else {
            info!(
                event_type = %event.event_type,
                run_id = %event.run_id,
                event_data = %data,
                "Event: {}", event.event_type
            );
        }
    }
}

#[async_trait]
impl EventSink for LoggingEventSink {
    async fn emit(&self, event: RunEvent) {
        self.log_event(&event);
    }

    fn try_emit(&self, event: RunEvent) {
        self.log_event(&event);
    }
}

/// Records every event in memory, for tests and reports.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<RunEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        self.events.read().clone()
    }

    /// Returns the collected event types in order.
    #[must_use]
    pub fn event_types(&self) -> Vec<String> {
        self.events.read().iter().map(|e| e.event_type.clone()).collect()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clears all collected events.
    pub fn clear(&self) {
        self.events.write().clear();
    }

    /// Returns events whose type starts with `type_prefix`.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<RunEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventSink for CollectingEventSink {
    async fn emit(&self, event: RunEvent) {
        self.events.write().push(event);
    }

    fn try_emit(&self, event: RunEvent) {
        self.events.write().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_noop_and_logging_sinks_accept_events() {
        let event = RunEvent::step_started(Uuid::nil(), "a");
        NoOpEventSink.emit(event.clone()).await;
        LoggingEventSink::default().emit(event.clone()).await;
        LoggingEventSink::debug().try_emit(event);
    }

    #[tokio::test]
    async fn test_collecting_sink() {
        let sink = CollectingEventSink::new();
        assert!(sink.is_empty());

        let run_id = Uuid::new_v4();
        sink.emit(RunEvent::step_started(run_id, "a")).await;
        sink.try_emit(RunEvent::step_completed(run_id, "a", 0.1));
        sink.emit(RunEvent::rolled_back(run_id, "panic")).await;

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.events_of_type("step.").len(), 2);
        assert_eq!(
            sink.event_types(),
            vec!["step.started", "step.completed", "run.rolled_back"]
        );

        sink.clear();
        assert!(sink.is_empty());
    }
}
