// # Email Provider Trait
//
// Defines the interface for sending transactional email through a vendor.
//
// ## Usage
//
// ```rust,ignore
// use conduit_core::traits::{EmailMessage, EmailProvider};
//
// let receipt = provider.send(&EmailMessage::new("user@test.com", "Hi", "Hello")).await?;
// let status = provider.get_status(&receipt.message_id).await?;
// ```

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::traits::StatusInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// An outgoing email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,

    /// Subject line
    pub subject: String,

    /// Body (HTML or plain text)
    pub content: String,

    /// Sender address, provider default if unset
    #[serde(default, alias = "from_email")]
    pub from: Option<String>,

    /// Carbon-copy recipients
    #[serde(default)]
    pub cc: Vec<String>,

    /// Blind carbon-copy recipients
    #[serde(default)]
    pub bcc: Vec<String>,

    /// Local files to attach
    #[serde(default)]
    pub attachments: Vec<PathBuf>,
}

impl EmailMessage {
    /// Create a message with just the required fields
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            content: content.into(),
            from: None,
            cc: Vec::new(),
            bcc: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Set the sender address
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Add a carbon-copy recipient
    pub fn with_cc(mut self, cc: impl Into<String>) -> Self {
        self.cc.push(cc.into());
        self
    }
}

/// Provider acknowledgement of an accepted email
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailReceipt {
    /// Provider message identifier
    pub message_id: String,

    /// Provider status label at acceptance time
    pub status: String,
}

/// Trait for email provider implementations
///
/// Providers perform one vendor call per invocation. Retry, backoff and
/// failover are owned by the gateway; a provider reports failure by
/// returning an error, using [`Error::transient`](crate::Error::transient)
/// for failures worth retrying and [`Error::permanent`](crate::Error::permanent)
/// for rejected requests.
#[async_trait]
pub trait EmailProvider: Send + Sync {
    /// Send an email
    async fn send(&self, message: &EmailMessage) -> Result<EmailReceipt>;

    /// Get the delivery status of a previously sent email
    async fn get_status(&self, message_id: &str) -> Result<StatusInfo>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &str;
}

/// Helper trait for constructing email providers from configuration
///
/// `create` may perform credential validation or an authentication
/// handshake. The gateway only calls it when the capability is invoked.
#[async_trait]
pub trait EmailProviderFactory: Send + Sync {
    /// Create an EmailProvider instance from configuration
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn EmailProvider>>;
}
