//! CLI error types

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::index::IndexError;

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

/// Errors surfaced by CLI commands
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Index(#[from] IndexError),

    /// Writing command output failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Report serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Command arguments are out of range
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// A stress run observed indexes that disagree
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),
}

impl CliError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(e) => e.code(),
            CliError::Index(e) => e.code(),
            CliError::Io(_) => "RECMGR_CLI_IO_ERROR",
            CliError::Json(_) => "RECMGR_CLI_JSON_ERROR",
            CliError::InvalidArguments(_) => "RECMGR_CLI_INVALID_ARGUMENTS",
            CliError::ConsistencyViolation(_) => "RECMGR_CONSISTENCY_VIOLATION",
        }
    }
}
