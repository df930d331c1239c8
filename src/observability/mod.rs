//! Observability for the field engine
//!
//! Structured JSON logging of typed events. Logging is read-only with
//! respect to the engine and never fails an operation.
//!
//! ```ignore
//! use fieldtree::observability::{Logger, Severity};
//!
//! Logger::set_min_severity(Severity::Trace);
//! ```

mod events;
mod logger;

pub use events::Event;
pub use logger::{Logger, Severity};

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
