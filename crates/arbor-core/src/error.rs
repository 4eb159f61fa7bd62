//! Error types for Arbor

use thiserror::Error;

/// Core Arbor errors
///
/// Lookups never fail with an error; absence is reported through
/// `Option` or `bool`. These variants cover misuse at the boundary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArborError {
    #[error("Invalid session id: {0:?}")]
    InvalidSessionId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}

/// Result type for Arbor operations
pub type ArborResult<T> = Result<T, ArborError>;
