// # Signing Provider Trait
//
// Defines the interface for e-signature services built around envelopes:
// a document plus the people who must sign it.

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::traits::StatusInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A person asked to sign an envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Signer email address
    pub email: String,

    /// Signer display name
    pub name: String,

    /// Optional role label (e.g. "buyer")
    #[serde(default)]
    pub role: Option<String>,
}

impl Signer {
    /// Create a signer without a role
    pub fn new(email: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            role: None,
        }
    }
}

/// Trait for e-signature provider implementations
#[async_trait]
pub trait SigningProvider: Send + Sync {
    /// Create an envelope and send it for signature, returning the envelope ID
    async fn create_envelope(
        &self,
        document: &Path,
        signers: &[Signer],
        subject: Option<&str>,
    ) -> Result<String>;

    /// Get the status of an envelope
    async fn get_status(&self, envelope_id: &str) -> Result<StatusInfo>;

    /// Void an envelope, returning whether the provider accepted the request
    async fn void(&self, envelope_id: &str, reason: &str) -> Result<bool>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &str;
}

/// Helper trait for constructing signing providers from configuration
#[async_trait]
pub trait SigningProviderFactory: Send + Sync {
    /// Create a SigningProvider instance from configuration
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn SigningProvider>>;
}
