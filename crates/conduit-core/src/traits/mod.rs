//! Capability contracts
//!
//! Each capability is one logical service family with a fixed operation
//! contract. Concrete vendor integrations implement the capability trait and
//! ship a factory that the [`ProviderRegistry`](crate::ProviderRegistry)
//! stores under a logical name.
//!
//! - [`EmailProvider`]: transactional email
//! - [`StorageProvider`]: object storage
//! - [`SigningProvider`]: e-signature envelopes
//! - [`SearchProvider`]: search indexing and queries
//! - [`PhysicalMailProvider`]: printed letters

pub mod email;
pub mod physical_mail;
pub mod search;
pub mod signing;
pub mod storage;

pub use email::{EmailMessage, EmailProvider, EmailProviderFactory, EmailReceipt};
pub use physical_mail::{Address, PhysicalMailProvider, PhysicalMailProviderFactory};
pub use search::{SearchProvider, SearchProviderFactory};
pub use signing::{Signer, SigningProvider, SigningProviderFactory};
pub use storage::{StorageProvider, StorageProviderFactory};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A logical service family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Transactional email
    Email,
    /// Object storage
    Storage,
    /// E-signature
    Signing,
    /// Search indexing
    Search,
    /// Physical mail
    PhysicalMail,
}

impl Capability {
    /// Every capability, in a stable order
    pub const ALL: [Capability; 5] = [
        Capability::Email,
        Capability::Storage,
        Capability::Signing,
        Capability::Search,
        Capability::PhysicalMail,
    ];

    /// Configuration key for the capability
    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::Email => "email",
            Capability::Storage => "storage",
            Capability::Signing => "signing",
            Capability::Search => "search",
            Capability::PhysicalMail => "physical_mail",
        }
    }

    /// Provider used when neither the request nor configuration names one
    pub fn default_provider(&self) -> &'static str {
        match self {
            Capability::Email => "sendgrid",
            Capability::Storage => "s3",
            Capability::Signing => "docusign",
            Capability::Search => "elasticsearch",
            Capability::PhysicalMail => "lob",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Capability {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Capability::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| crate::Error::config(format!("Unknown capability: {}", s)))
    }
}

/// Provider-reported status of a message, envelope or letter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusInfo {
    /// Provider status label (e.g. "delivered", "sent", "voided")
    pub status: String,

    /// Any additional provider-specific fields
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl StatusInfo {
    /// Create a status with no extra details
    pub fn new(status: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            details: Map::new(),
        }
    }

    /// Attach a detail field
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_round_trip_names() {
        for capability in Capability::ALL {
            let parsed: Capability = capability.as_str().parse().unwrap();
            assert_eq!(parsed, capability);
        }
        assert_eq!("Physical-Mail".parse::<Capability>().unwrap(), Capability::PhysicalMail);
        assert!("fax".parse::<Capability>().is_err());
    }

    #[test]
    fn test_status_info_flattens_details() {
        let status = StatusInfo::new("delivered").with_detail("provider", "dummy");
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({"status": "delivered", "provider": "dummy"}));
    }
}
