//! Pipeline configuration
//!
//! Loaded from a JSON file. Every field is optional and falls back to its
//! default, so an empty object `{}` is a valid configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::pipeline::DEFAULT_AGGREGATE_PAGE_SIZE;

/// Why a configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tunables shared by every component of one pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Page size the aggregate component requests from its source
    #[serde(default = "default_aggregate_page_size")]
    pub aggregate_page_size: usize,

    /// Reject order-by comparisons across different value categories
    #[serde(default = "default_order_by_type_guard")]
    pub order_by_type_guard: bool,

    /// Minimum log severity (trace, info, warn, error, fatal)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_aggregate_page_size() -> usize {
    DEFAULT_AGGREGATE_PAGE_SIZE
}

fn default_order_by_type_guard() -> bool {
    true
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aggregate_page_size: default_aggregate_page_size(),
            order_by_type_guard: default_order_by_type_guard(),
            log_level: default_log_level(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&content)?;

        let page_size = config.aggregate_page_size.to_string();
        let type_guard = config.order_by_type_guard.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("aggregate_page_size", page_size.as_str()),
                ("log_level", config.log_level.as_str()),
                ("order_by_type_guard", type_guard.as_str()),
            ],
        );
        Ok(config)
    }

    /// Parse and validate configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.aggregate_page_size == 0 {
            return Err(ConfigError::Invalid(
                "aggregate_page_size must be > 0".to_string(),
            ));
        }
        self.severity()?;
        Ok(())
    }

    /// The configured minimum log severity
    pub fn severity(&self) -> Result<Severity, ConfigError> {
        self.log_level
            .parse::<Severity>()
            .map_err(ConfigError::Invalid)
    }

    /// Install the configured minimum severity on the process logger
    pub fn apply_logging(&self) -> Result<(), ConfigError> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("aeroquery.json");
        fs::write(&config_path, "{}").unwrap();

        let config = PipelineConfig::load(&config_path).unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.aggregate_page_size, i32::MAX as usize);
        assert!(config.order_by_type_guard);
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_config_overrides() {
        let config = PipelineConfig::from_json(
            &json!({
                "aggregate_page_size": 50,
                "order_by_type_guard": false,
                "log_level": "trace"
            })
            .to_string(),
        )
        .unwrap();
        assert_eq!(config.aggregate_page_size, 50);
        assert!(!config.order_by_type_guard);
        assert_eq!(config.severity().unwrap(), Severity::Trace);
    }

    #[test]
    fn test_config_rejects_zero_page_size() {
        let result = PipelineConfig::from_json(r#"{"aggregate_page_size": 0}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_unknown_log_level() {
        let result = PipelineConfig::from_json(r#"{"log_level": "loud"}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_config_rejects_bad_json() {
        let result = PipelineConfig::from_json("{not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = PipelineConfig::load(&temp_dir.path().join("missing.json"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
