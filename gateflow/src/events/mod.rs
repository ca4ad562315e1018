//! Event sink system for the presentation layer.
//!
//! The run controller emits [`RunEvent`](crate::core::RunEvent)s to a sink
//! it owns; there is no process-wide sink.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
