//! Error types for bheeshma.
//!
//! Only direct API misuse surfaces as an [`Error`]. Failures inside
//! the interception wrappers, attribution, or pattern analysis are
//! absorbed so that monitored code never observes the monitor.

use thiserror::Error;

/// Result type alias using bheeshma's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised for malformed direct API use.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration value failed validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration object failed validation with a list of issues
    #[error("Invalid configuration: {}", .0.join("; "))]
    ConfigValidation(Vec<String>),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Unknown report format requested
    #[error("Unknown report format: {0}")]
    UnknownFormat(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
