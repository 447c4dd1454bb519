//! Cooperative cancellation for in-flight steps.

mod token;

pub use token::CancellationToken;
