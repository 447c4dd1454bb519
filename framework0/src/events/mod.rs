//! Event sinks that observe scheduler runs.
//!
//! A sink is injected into the scheduler; there is no process-wide default.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
