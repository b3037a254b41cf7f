//! Observability for the query pipeline
//!
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Scope-based begin/complete logging
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aeroquery::observability::{Logger, Severity, log_event_with_fields, Event};
//!
//! Logger::set_min_severity(Severity::Info);
//! log_event_with_fields(Event::ContinuationRejected, &[("field", "offset")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event(Event::ConfigLoaded);
        log_event(Event::DrainCancelled);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::ContinuationRejected, &[("token", "{\"offset\":9}")]);
    }
}
