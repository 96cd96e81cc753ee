//! Error types for the conduit gateway
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for conduit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the conduit gateway
#[derive(Error, Debug)]
pub enum Error {
    /// Capability requested but no provider is configured or registered
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Required request field missing or malformed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Network, rate-limit or 5xx-class failure from a vendor
    #[error("Provider error ({provider}): {message}")]
    TransientProvider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Vendor rejected the request as structurally invalid
    #[error("Provider rejected request ({provider}): {message}")]
    PermanentProvider {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },

    /// Failure to persist an audit record
    #[error("Audit write error: {0}")]
    AuditWrite(String),

    /// Secret store errors
    #[error("Secret error: {0}")]
    Secret(String),

    /// Object, envelope, letter or message not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a transient (retryable) provider error
    pub fn transient(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::TransientProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a permanent (non-retryable) provider error
    pub fn permanent(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PermanentProvider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an audit write error
    pub fn audit_write(msg: impl Into<String>) -> Self {
        Self::AuditWrite(msg.into())
    }

    /// Create a secret store error
    pub fn secret(msg: impl Into<String>) -> Self {
        Self::Secret(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Whether the retry handler may attempt the operation again.
    ///
    /// Transport-level failures are retryable. Anything that would fail the
    /// same way on every attempt is not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::TransientProvider { .. } | Error::Io(_) | Error::Other(_)
        )
    }

    /// Stable label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Configuration(_) => "configuration",
            Error::Validation(_) => "validation",
            Error::TransientProvider { .. } => "transient_provider",
            Error::PermanentProvider { .. } => "permanent_provider",
            Error::AuditWrite(_) => "audit_write",
            Error::Secret(_) => "secret",
            Error::NotFound(_) => "not_found",
            Error::Io(_) => "io",
            Error::Json(_) => "json",
            Error::Yaml(_) => "yaml",
            Error::Other(_) => "other",
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
