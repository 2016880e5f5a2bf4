//! Structured events reported by the drivers.
//!
//! There is no process-wide sink: the entry point builds one sink and hands
//! an `Arc<dyn EventSink>` to each driver it constructs.

mod sink;

pub use sink::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink, RecordedEvent};

use std::sync::Arc;

/// Shared handle to an event sink.
pub type SharedEventSink = Arc<dyn EventSink>;

/// Returns a sink that logs through `tracing` at INFO.
#[must_use]
pub fn logging_sink() -> SharedEventSink {
    Arc::new(LoggingEventSink::info())
}
