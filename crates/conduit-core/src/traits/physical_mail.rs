// # Physical Mail Provider Trait
//
// Defines the interface for services that print and post letters.

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::traits::StatusInfo;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A postal address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// Addressee name
    #[serde(default)]
    pub name: String,

    /// First address line
    #[serde(default)]
    pub address_line1: String,

    /// Second address line
    #[serde(default)]
    pub address_line2: Option<String>,

    /// City
    #[serde(default)]
    pub city: String,

    /// State or region
    #[serde(default)]
    pub state: String,

    /// Postal code
    #[serde(default)]
    pub zip: String,

    /// ISO country code
    #[serde(default = "default_country")]
    pub country: String,
}

fn default_country() -> String {
    "US".to_string()
}

impl Default for Address {
    fn default() -> Self {
        Self {
            name: String::new(),
            address_line1: String::new(),
            address_line2: None,
            city: String::new(),
            state: String::new(),
            zip: String::new(),
            country: default_country(),
        }
    }
}

/// Trait for physical mail provider implementations
#[async_trait]
pub trait PhysicalMailProvider: Send + Sync {
    /// Send a letter, returning the provider letter ID
    async fn send_letter(
        &self,
        to_address: &Address,
        from_address: &Address,
        content: &str,
        color: bool,
    ) -> Result<String>;

    /// Get the status of a letter
    async fn get_status(&self, letter_id: &str) -> Result<StatusInfo>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &str;
}

/// Helper trait for constructing physical mail providers from configuration
#[async_trait]
pub trait PhysicalMailProviderFactory: Send + Sync {
    /// Create a PhysicalMailProvider instance from configuration
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn PhysicalMailProvider>>;
}
