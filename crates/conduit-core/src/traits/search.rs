// # Search Provider Trait
//
// Defines the interface for search indexing backends.

use crate::config::ProviderConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// Trait for search provider implementations
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Run a query against an index
    ///
    /// `filters` are exact-match field constraints. At most `limit`
    /// documents are returned.
    async fn query(
        &self,
        text: &str,
        index: &str,
        filters: Option<&Map<String, Value>>,
        limit: usize,
    ) -> Result<Vec<Value>>;

    /// Index (insert or replace) a document under `id`
    async fn index_document(&self, id: &str, document: &Value, index: &str) -> Result<bool>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &str;
}

/// Helper trait for constructing search providers from configuration
#[async_trait]
pub trait SearchProviderFactory: Send + Sync {
    /// Create a SearchProvider instance from configuration
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn SearchProvider>>;
}
