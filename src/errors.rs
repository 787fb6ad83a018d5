//! Error types for the vnpay-rs library.
//!
//! This module defines all error types that can occur during gateway
//! protocol operations.
//!
//! Signature verification deliberately never surfaces through this enum:
//! an unauthentic callback is a normal protocol outcome (see
//! [`crate::callback::CallbackVerdict`]), not an error, so that malformed
//! or attacker-controlled input cannot be distinguished by error shape.

use thiserror::Error;

/// Main error type for gateway operations.
#[derive(Error, Debug)]
pub enum VnpError {
    /// Missing or invalid deployment configuration (merchant code, secret, URLs)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Payment amount is out of range or cannot be represented on the wire
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A caller-supplied request field failed validation
    #[error("Validation failed: {0}")]
    ValidationError(String),

    /// Required field absent from a request or callback
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// Transient persistence failure; retryable, distinct from any
    /// authenticity outcome
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error parsing a URL
    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),

    /// Generic error with custom message
    #[error("{0}")]
    Other(String),
}

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, VnpError>;

impl VnpError {
    /// Builds a [`VnpError::StorageError`] from any displayable source.
    ///
    /// Store implementations wrap their backend errors with this so the
    /// settlement handlers can propagate them for retry without knowing
    /// the backend type.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        VnpError::StorageError(err.to_string())
    }
}
