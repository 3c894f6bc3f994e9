//! Record manager configuration
//!
//! Loaded from a JSON file; every field is optional:
//!
//! ```json
//! { "default_degree": 32, "log_level": "info" }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::MIN_DEGREE;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    /// Config file is not valid JSON for `RecmgrConfig`
    #[error("Invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// A field holds an unusable value
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Read(_) => "RECMGR_CONFIG_READ",
            ConfigError::Parse(_) => "RECMGR_CONFIG_PARSE",
            ConfigError::Invalid(_) => "RECMGR_CONFIG_INVALID",
        }
    }
}

/// Record manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecmgrConfig {
    /// Degree used by `Group::index_with_default` (default: 32)
    #[serde(default = "default_degree")]
    pub default_degree: usize,

    /// Minimum log severity: trace, info, warn, error or fatal (default: info)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_degree() -> usize {
    32
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RecmgrConfig {
    fn default() -> Self {
        Self {
            default_degree: default_degree(),
            log_level: default_log_level(),
        }
    }
}

impl RecmgrConfig {
    /// Load and validate configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: RecmgrConfig = serde_json::from_str(&content)?;
        config.validate()?;

        let shown = path.display().to_string();
        log_event_with_fields(Event::ConfigLoaded, &[("path", shown.as_str())]);

        Ok(config)
    }

    /// Validate field values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.default_degree < MIN_DEGREE {
            return Err(ConfigError::Invalid(format!(
                "default_degree must be >= {}, got {}",
                MIN_DEGREE, self.default_degree
            )));
        }

        self.severity()?;
        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    /// Install `log_level` as the process-wide logging threshold
    pub fn apply_logging(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }
}
