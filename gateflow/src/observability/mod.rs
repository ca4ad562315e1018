//! Logging setup and run span attributes.

mod span;
mod subscriber;

pub use span::RunSpanAttributes;
pub use subscriber::{init_tracing, LogFormat, TracingConfig, DEFAULT_FILTER};
