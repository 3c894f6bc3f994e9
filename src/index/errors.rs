//! Index error types
//!
//! Error codes:
//! - RECMGR_INVALID_DEGREE

use thiserror::Error;

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors raised while building indexes.
///
/// Reads and group writes never fail; their outcomes are reported through
/// return values only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The tree degree is below the minimum of 2
    #[error("Invalid index degree {degree} (minimum: {min})", min = super::btree::MIN_DEGREE)]
    InvalidDegree { degree: usize },
}

impl IndexError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            IndexError::InvalidDegree { .. } => "RECMGR_INVALID_DEGREE",
        }
    }
}
