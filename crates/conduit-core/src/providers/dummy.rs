// # Dummy Providers
//
// Always-succeeding providers for every capability. Identifiers are random
// UUIDs and all state lives in memory, shared by every provider the same
// factory builds, so a status lookup sees what an earlier call created.
//
// ## Configuration
//
// - `fail` (bool): every call fails with a transient error. Handy for
//   exercising retry and fallback without a real outage.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::ProviderConfig;
use crate::error::{Error, Result};
use crate::traits::{
    Address, EmailMessage, EmailProvider, EmailProviderFactory, EmailReceipt,
    PhysicalMailProvider, PhysicalMailProviderFactory, SearchProvider, SearchProviderFactory,
    Signer, SigningProvider, SigningProviderFactory, StatusInfo, StorageProvider,
    StorageProviderFactory,
};

/// Registered name of the built-in providers
pub const DUMMY_PROVIDER: &str = "dummy";

#[derive(Debug, Default)]
struct DummyState {
    emails: RwLock<HashMap<String, EmailMessage>>,
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    envelopes: RwLock<HashMap<String, String>>,
    documents: RwLock<HashMap<String, BTreeMap<String, Value>>>,
    letters: RwLock<HashMap<String, Address>>,
}

/// Factory for every dummy provider
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct DummyFactory {
    state: Arc<DummyState>,
}

impl DummyFactory {
    /// Create a factory with empty state
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, config: &ProviderConfig) -> DummyHandle {
        DummyHandle {
            state: self.state.clone(),
            fail: config.get_bool("fail").unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
struct DummyHandle {
    state: Arc<DummyState>,
    fail: bool,
}

impl DummyHandle {
    fn check(&self) -> Result<()> {
        if self.fail {
            return Err(Error::transient(DUMMY_PROVIDER, "simulated failure"));
        }
        Ok(())
    }
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}

/// Dummy email provider
#[derive(Debug, Clone)]
pub struct DummyEmailProvider {
    inner: DummyHandle,
}

#[async_trait]
impl EmailProvider for DummyEmailProvider {
    async fn send(&self, message: &EmailMessage) -> Result<EmailReceipt> {
        self.inner.check()?;
        let message_id = new_id("msg");
        self.inner
            .state
            .emails
            .write()
            .await
            .insert(message_id.clone(), message.clone());
        tracing::debug!("Dummy email {} to {}", message_id, message.to);
        Ok(EmailReceipt {
            message_id,
            status: "sent".to_string(),
        })
    }

    async fn get_status(&self, message_id: &str) -> Result<StatusInfo> {
        self.inner.check()?;
        let emails = self.inner.state.emails.read().await;
        let message = emails
            .get(message_id)
            .ok_or_else(|| Error::not_found(format!("email {}", message_id)))?;
        Ok(StatusInfo::new("delivered").with_detail("to", message.to.clone()))
    }

    fn provider_name(&self) -> &str {
        DUMMY_PROVIDER
    }
}

#[async_trait]
impl EmailProviderFactory for DummyFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn EmailProvider>> {
        Ok(Box::new(DummyEmailProvider {
            inner: self.handle(config),
        }))
    }
}

/// Dummy object storage
#[derive(Debug, Clone)]
pub struct DummyStorageProvider {
    inner: DummyHandle,
}

#[async_trait]
impl StorageProvider for DummyStorageProvider {
    async fn upload(&self, file: &Path, bucket: &str, object_name: Option<&str>) -> Result<String> {
        self.inner.check()?;
        let bytes = fs::read(file).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::not_found(format!("{}", file.display()))
            } else {
                Error::Io(e)
            }
        })?;
        let name = match object_name {
            Some(name) => name.to_string(),
            None => file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::validation("file has no name"))?,
        };

        self.inner
            .state
            .objects
            .write()
            .await
            .insert((bucket.to_string(), name.clone()), bytes);
        Ok(format!("dummy://{}/{}", bucket, name))
    }

    async fn download(
        &self,
        object_name: &str,
        bucket: &str,
        destination: &Path,
    ) -> Result<PathBuf> {
        self.inner.check()?;
        let bytes = self
            .inner
            .state
            .objects
            .read()
            .await
            .get(&(bucket.to_string(), object_name.to_string()))
            .cloned()
            .ok_or_else(|| Error::not_found(format!("object {}/{}", bucket, object_name)))?;

        if let Some(parent) = destination.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }
        fs::write(destination, bytes).await?;
        Ok(destination.to_path_buf())
    }

    async fn delete(&self, object_name: &str, bucket: &str) -> Result<bool> {
        self.inner.check()?;
        let removed = self
            .inner
            .state
            .objects
            .write()
            .await
            .remove(&(bucket.to_string(), object_name.to_string()));
        Ok(removed.is_some())
    }

    async fn list(&self, bucket: &str, prefix: Option<&str>) -> Result<Vec<String>> {
        self.inner.check()?;
        let objects = self.inner.state.objects.read().await;
        Ok(objects
            .keys()
            .filter(|(b, name)| b == bucket && prefix.is_none_or(|p| name.starts_with(p)))
            .map(|(_, name)| name.clone())
            .collect())
    }

    fn provider_name(&self) -> &str {
        DUMMY_PROVIDER
    }
}

#[async_trait]
impl StorageProviderFactory for DummyFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn StorageProvider>> {
        Ok(Box::new(DummyStorageProvider {
            inner: self.handle(config),
        }))
    }
}

/// Dummy e-signature provider
#[derive(Debug, Clone)]
pub struct DummySigningProvider {
    inner: DummyHandle,
}

#[async_trait]
impl SigningProvider for DummySigningProvider {
    async fn create_envelope(
        &self,
        _document: &Path,
        signers: &[Signer],
        _subject: Option<&str>,
    ) -> Result<String> {
        self.inner.check()?;
        let envelope_id = new_id("env");
        self.inner
            .state
            .envelopes
            .write()
            .await
            .insert(envelope_id.clone(), "sent".to_string());
        tracing::debug!("Dummy envelope {} for {} signers", envelope_id, signers.len());
        Ok(envelope_id)
    }

    async fn get_status(&self, envelope_id: &str) -> Result<StatusInfo> {
        self.inner.check()?;
        self.inner
            .state
            .envelopes
            .read()
            .await
            .get(envelope_id)
            .map(StatusInfo::new)
            .ok_or_else(|| Error::not_found(format!("envelope {}", envelope_id)))
    }

    async fn void(&self, envelope_id: &str, _reason: &str) -> Result<bool> {
        self.inner.check()?;
        let mut envelopes = self.inner.state.envelopes.write().await;
        match envelopes.get_mut(envelope_id) {
            Some(status) => {
                *status = "voided".to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn provider_name(&self) -> &str {
        DUMMY_PROVIDER
    }
}

#[async_trait]
impl SigningProviderFactory for DummyFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn SigningProvider>> {
        Ok(Box::new(DummySigningProvider {
            inner: self.handle(config),
        }))
    }
}

/// Dummy search index
///
/// A document matches when its JSON text contains the query (ignoring case)
/// and every filter field is equal.
#[derive(Debug, Clone)]
pub struct DummySearchProvider {
    inner: DummyHandle,
}

#[async_trait]
impl SearchProvider for DummySearchProvider {
    async fn query(
        &self,
        text: &str,
        index: &str,
        filters: Option<&Map<String, Value>>,
        limit: usize,
    ) -> Result<Vec<Value>> {
        self.inner.check()?;
        let needle = text.to_lowercase();
        let documents = self.inner.state.documents.read().await;
        let Some(docs) = documents.get(index) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .values()
            .filter(|doc| needle.is_empty() || doc.to_string().to_lowercase().contains(&needle))
            .filter(|doc| {
                filters.is_none_or(|f| f.iter().all(|(k, v)| doc.get(k) == Some(v)))
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn index_document(&self, id: &str, document: &Value, index: &str) -> Result<bool> {
        self.inner.check()?;
        self.inner
            .state
            .documents
            .write()
            .await
            .entry(index.to_string())
            .or_default()
            .insert(id.to_string(), document.clone());
        Ok(true)
    }

    fn provider_name(&self) -> &str {
        DUMMY_PROVIDER
    }
}

#[async_trait]
impl SearchProviderFactory for DummyFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn SearchProvider>> {
        Ok(Box::new(DummySearchProvider {
            inner: self.handle(config),
        }))
    }
}

/// Dummy physical mail provider
#[derive(Debug, Clone)]
pub struct DummyPhysicalMailProvider {
    inner: DummyHandle,
}

#[async_trait]
impl PhysicalMailProvider for DummyPhysicalMailProvider {
    async fn send_letter(
        &self,
        to_address: &Address,
        _from_address: &Address,
        _content: &str,
        _color: bool,
    ) -> Result<String> {
        self.inner.check()?;
        let letter_id = new_id("ltr");
        self.inner
            .state
            .letters
            .write()
            .await
            .insert(letter_id.clone(), to_address.clone());
        Ok(letter_id)
    }

    async fn get_status(&self, letter_id: &str) -> Result<StatusInfo> {
        self.inner.check()?;
        let letters = self.inner.state.letters.read().await;
        let to = letters
            .get(letter_id)
            .ok_or_else(|| Error::not_found(format!("letter {}", letter_id)))?;
        Ok(StatusInfo::new("in_transit").with_detail("to", to.name.clone()))
    }

    fn provider_name(&self) -> &str {
        DUMMY_PROVIDER
    }
}

#[async_trait]
impl PhysicalMailProviderFactory for DummyFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn PhysicalMailProvider>> {
        Ok(Box::new(DummyPhysicalMailProvider {
            inner: self.handle(config),
        }))
    }
}
