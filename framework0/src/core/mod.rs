//! Core domain types shared by the scheduler and its observers:
//! - Run and step status enums
//! - Run lifecycle events

mod event;
mod status;

pub use event::RunEvent;
pub use status::{RunState, StepStatus};
