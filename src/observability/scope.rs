//! ObservationScope for start/complete logging around a long operation
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` or `{name}_FAILED` when closed
//! - Logs `{name}_INCOMPLETE` if dropped without being closed

use std::time::Instant;

use super::logger::Logger;

/// A scope that logs the begin and end of an operation with its elapsed time
pub struct ObservationScope {
    name: &'static str,
    fields: Vec<(&'static str, String)>,
    started: Instant,
    closed: bool,
}

impl ObservationScope {
    /// Open a scope; logs `{name}_BEGIN` at TRACE level.
    pub fn new(name: &'static str) -> Self {
        Self::with_fields(name, Vec::new())
    }

    /// Open a scope whose fields are repeated on every line it logs
    pub fn with_fields(name: &'static str, fields: Vec<(&'static str, String)>) -> Self {
        let scope = Self {
            name,
            fields,
            started: Instant::now(),
            closed: false,
        };
        Logger::trace(&format!("{}_BEGIN", name), &scope.field_refs());
        scope
    }

    fn field_refs(&self) -> Vec<(&str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect()
    }

    /// Milliseconds since the scope was opened
    pub fn elapsed_ms(&self) -> String {
        self.started.elapsed().as_millis().to_string()
    }

    /// Close the scope successfully; logs `{name}_COMPLETE` at INFO level.
    pub fn complete(mut self, extra_fields: &[(&str, &str)]) {
        self.closed = true;
        let elapsed = self.elapsed_ms();
        let mut fields = self.field_refs();
        fields.extend(extra_fields.iter().copied());
        fields.push(("elapsed_ms", elapsed.as_str()));
        Logger::info(&format!("{}_COMPLETE", self.name), &fields);
    }

    /// Close the scope as failed; logs `{name}_FAILED` at WARN level.
    pub fn fail(mut self, reason: &str) {
        self.closed = true;
        let mut fields = self.field_refs();
        fields.push(("reason", reason));
        Logger::warn(&format!("{}_FAILED", self.name), &fields);
    }

    /// Check if the scope has been closed
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.closed {
            Logger::warn(
                &format!("{}_INCOMPLETE", self.name),
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}
