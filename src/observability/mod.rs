//! Observability subsystem for recmgr
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Per-group counters
//!
//! Observability is read-only: nothing here changes the outcome of a group
//! or index operation.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
