//! Query pipeline error types
//!
//! Error codes:
//! - AERO_QUERY_BAD_REQUEST (ERROR)
//! - AERO_QUERY_CANCELLED (ERROR)
//! - AERO_QUERY_INVARIANT_VIOLATION (FATAL)
//! - AERO_QUERY_UNSUPPORTED (ERROR)
//! - AERO_QUERY_INVALID_RESPONSE (ERROR)
//! - AERO_QUERY_UPSTREAM (ERROR)

use std::error::Error as StdError;
use std::fmt;

use crate::observability::{log_event_with_fields, Event};

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The query failed but the client is healthy
    Error,
    /// A programming invariant was broken
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorCode {
    /// Malformed or tampered continuation, invalid argument
    BadRequest,
    /// Cancellation observed during a drain
    Cancelled,
    /// Unrecognised operator or flavor tag, inconsistent cursor
    InvariantViolation,
    /// Operation the pipeline cannot perform correctly
    Unsupported,
    /// Upstream produced a row that cannot be decoded
    InvalidResponse,
    /// Failure raised by a wrapped source, passed through unchanged
    Upstream,
}

impl QueryErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            QueryErrorCode::BadRequest => "AERO_QUERY_BAD_REQUEST",
            QueryErrorCode::Cancelled => "AERO_QUERY_CANCELLED",
            QueryErrorCode::InvariantViolation => "AERO_QUERY_INVARIANT_VIOLATION",
            QueryErrorCode::Unsupported => "AERO_QUERY_UNSUPPORTED",
            QueryErrorCode::InvalidResponse => "AERO_QUERY_INVALID_RESPONSE",
            QueryErrorCode::Upstream => "AERO_QUERY_UPSTREAM",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            QueryErrorCode::InvariantViolation => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for QueryErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Query pipeline error with full context
#[derive(Debug)]
pub struct QueryError {
    code: QueryErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl QueryError {
    fn new(code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create a bad request error
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::BadRequest, reason)
    }

    /// Create a cancellation error
    pub fn cancelled() -> Self {
        Self::new(QueryErrorCode::Cancelled, "operation was cancelled")
    }

    /// Create an invariant violation (FATAL).
    ///
    /// Invariant violations are logged as they are raised.
    pub fn invariant_violation(reason: impl Into<String>) -> Self {
        let err = Self::new(QueryErrorCode::InvariantViolation, reason);
        log_event_with_fields(Event::InvariantViolation, &[("reason", err.message())]);
        err
    }

    /// Create an unsupported operation error
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::Unsupported, reason)
    }

    /// Create an invalid response error
    pub fn invalid_response(reason: impl Into<String>) -> Self {
        Self::new(QueryErrorCode::InvalidResponse, reason)
    }

    /// Wrap a failure raised by a source
    pub fn upstream<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            code: QueryErrorCode::Upstream,
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    /// Returns whether the caller cancelled the operation
    pub fn is_cancelled(&self) -> bool {
        self.code == QueryErrorCode::Cancelled
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl StdError for QueryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Result type for query pipeline operations
pub type QueryResult<T> = Result<T, QueryError>;
