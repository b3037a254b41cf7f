//! CLI-specific error types

use std::fmt;
use std::io;

use crate::config::ConfigError;
use crate::errors::QueryError;

/// CLI error codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliErrorCode {
    /// Configuration file error
    ConfigError,
    /// I/O error (files, stdout)
    IoError,
    /// Fixture could not be parsed
    InvalidInput,
    /// The pipeline failed
    QueryFailed,
}

impl CliErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ConfigError => "AERO_CLI_CONFIG_ERROR",
            Self::IoError => "AERO_CLI_IO_ERROR",
            Self::InvalidInput => "AERO_CLI_INVALID_INPUT",
            Self::QueryFailed => "AERO_CLI_QUERY_FAILED",
        }
    }
}

/// CLI error
#[derive(Debug)]
pub struct CliError {
    code: CliErrorCode,
    message: String,
}

impl CliError {
    /// Create a new CLI error
    pub fn new(code: CliErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Config error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::ConfigError, msg)
    }

    /// I/O error
    pub fn io_error(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::IoError, msg)
    }

    /// Invalid fixture
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::new(CliErrorCode::InvalidInput, msg)
    }

    /// Get the error code
    pub fn code(&self) -> &CliErrorCode {
        &self.code
    }

    /// Get the error code string
    pub fn code_str(&self) -> &'static str {
        self.code.code()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for CliError {}

impl From<io::Error> for CliError {
    fn from(e: io::Error) -> Self {
        Self::io_error(e.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        Self::config_error(e.to_string())
    }
}

impl From<QueryError> for CliError {
    fn from(e: QueryError) -> Self {
        Self::new(CliErrorCode::QueryFailed, e.to_string())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_error_maps_to_query_failed() {
        let err: CliError = QueryError::bad_request("tampered").into();
        assert_eq!(err.code(), &CliErrorCode::QueryFailed);
        assert!(err.message().contains("tampered"));
        assert!(err.to_string().starts_with("AERO_CLI_QUERY_FAILED"));
    }

    #[test]
    fn test_config_error_maps_to_config_error() {
        let err: CliError = ConfigError::Invalid("bad".into()).into();
        assert_eq!(err.code_str(), "AERO_CLI_CONFIG_ERROR");
    }
}
