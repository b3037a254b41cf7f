//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//! - Lines below the process-wide minimum severity are dropped

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Per-batch detail
    Trace = 0,
    /// Normal lifecycle
    Info = 1,
    /// Rejected input, cancellation
    Warn = 2,
    /// Query failures
    Error = 3,
    /// Broken invariants
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Severity::Trace,
            1 => Severity::Info,
            2 => Severity::Warn,
            3 => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

static MIN_SEVERITY: AtomicU8 = AtomicU8::new(Severity::Warn as u8);
static STDERR_ONLY: AtomicBool = AtomicBool::new(false);

/// A structured logger that outputs JSON lines
pub struct Logger;

impl Logger {
    /// Set the process-wide minimum severity
    pub fn set_min_severity(severity: Severity) {
        MIN_SEVERITY.store(severity as u8, Ordering::Relaxed);
    }

    /// Current process-wide minimum severity
    pub fn min_severity() -> Severity {
        Severity::from_u8(MIN_SEVERITY.load(Ordering::Relaxed))
    }

    /// Returns true if a line at `severity` would be written
    pub fn enabled(severity: Severity) -> bool {
        severity >= Self::min_severity()
    }

    /// Send every line to stderr, keeping stdout for command output
    pub fn set_stderr_only(stderr_only: bool) {
        STDERR_ONLY.store(stderr_only, Ordering::Relaxed);
    }

    fn writes_to_stderr(severity: Severity) -> bool {
        severity >= Severity::Error || STDERR_ONLY.load(Ordering::Relaxed)
    }

    /// Log an event. ERROR and FATAL go to stderr, everything else to stdout
    /// unless [`Logger::set_stderr_only`] is on.
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = Self::render(severity, event, fields);
        if Self::writes_to_stderr(severity) {
            Self::write_line(&line, &mut io::stderr());
        } else {
            Self::write_line(&line, &mut io::stdout());
        }
    }

    fn write_line<W: Write>(line: &str, writer: &mut W) {
        let _ = writer.write_all(line.as_bytes());
        let _ = writer.flush();
    }

    /// Render one log line, newline included
    fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut output = String::with_capacity(128);
        output.push_str("{\"event\":");
        push_json_str(&mut output, event);
        output.push_str(",\"severity\":\"");
        output.push_str(severity.as_str());
        output.push('"');

        let mut sorted: Vec<&(&str, &str)> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);
        for (key, value) in sorted {
            output.push(',');
            push_json_str(&mut output, key);
            output.push(':');
            push_json_str(&mut output, value);
        }

        output.push_str("}\n");
        output
    }

    /// Log at TRACE level
    pub fn trace(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Trace, event, fields);
    }

    /// Log at INFO level
    pub fn info(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Info, event, fields);
    }

    /// Log at WARN level
    pub fn warn(event: &str, fields: &[(&str, &str)]) {
        Self::log(Severity::Warn, event, fields);
    }
}

fn push_json_str(output: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => output.push_str(&quoted),
        Err(_) => output.push_str("\"\""),
    }
}
