// # Storage Provider Trait
//
// Defines the interface for object storage backends (buckets of named objects).

use crate::config::ProviderConfig;
use crate::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Trait for object storage provider implementations
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Upload a local file
    ///
    /// `object_name` defaults to the file name. Returns the URL of the stored object.
    async fn upload(&self, file: &Path, bucket: &str, object_name: Option<&str>) -> Result<String>;

    /// Download an object to `destination`, returning the local path written
    async fn download(&self, object_name: &str, bucket: &str, destination: &Path)
    -> Result<PathBuf>;

    /// Delete an object, returning whether anything was removed
    async fn delete(&self, object_name: &str, bucket: &str) -> Result<bool>;

    /// List object names in a bucket, optionally restricted to a prefix
    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &str;
}

/// Helper trait for constructing storage providers from configuration
#[async_trait]
pub trait StorageProviderFactory: Send + Sync {
    /// Create a StorageProvider instance from configuration
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn StorageProvider>>;
}
