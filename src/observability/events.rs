//! Observable pipeline events
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events raised by query pipeline components
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Pipeline configuration loaded
    ConfigLoaded,

    // Component construction
    /// Continuation token failed to parse or failed the tamper check
    ContinuationRejected,

    // Drain
    /// One batch pulled through an offset or limit component
    BatchDrained,
    /// Drain abandoned because cancellation was requested
    DrainCancelled,

    // Merge
    /// Cross-partition order-by saw mixed value types
    OrderByTypeMismatch,

    // Internal
    /// A programming invariant was broken
    InvariantViolation,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::ContinuationRejected => "CONTINUATION_REJECTED",
            Event::BatchDrained => "BATCH_DRAINED",
            Event::DrainCancelled => "DRAIN_CANCELLED",
            Event::OrderByTypeMismatch => "ORDER_BY_TYPE_MISMATCH",
            Event::InvariantViolation => "INVARIANT_VIOLATION",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::BatchDrained => Severity::Trace,
            Event::ConfigLoaded => Severity::Info,
            Event::ContinuationRejected | Event::DrainCancelled => Severity::Warn,
            Event::OrderByTypeMismatch => Severity::Error,
            Event::InvariantViolation => Severity::Fatal,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_are_screaming_snake_case() {
        let events = [
            Event::ConfigLoaded,
            Event::ContinuationRejected,
            Event::BatchDrained,
            Event::DrainCancelled,
            Event::OrderByTypeMismatch,
            Event::InvariantViolation,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_ascii_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_only_invariant_violation_is_fatal() {
        assert!(Event::InvariantViolation.is_fatal());
        assert!(!Event::OrderByTypeMismatch.is_fatal());
        assert!(!Event::DrainCancelled.is_fatal());
    }
}
