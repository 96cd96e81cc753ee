//! Gateway facade
//!
//! The [`Gateway`] is the single entry point callers use. Each operation takes
//! a typed request and returns an [`OperationResult`]; internal failures never
//! escape as errors.
//!
//! ## Call Path
//!
//! ```text
//! request ── validate ──┐
//!                       ▼
//!              provider chain          override ▸ configured ▸ default,
//!                       │              then configured fallbacks
//!                       ▼
//!           ┌── FallbackController ──────────────────────┐
//!           │  for each provider:                        │
//!           │    RetryPolicy { resolve secrets,          │
//!           │                  build via registry,       │
//!           │                  invoke capability }       │
//!           │    AuditLogger::log_call                   │
//!           └────────────────────────────────────────────┘
//!                       │
//!                       ▼
//!               OperationResult
//! ```
//!
//! ## Notes
//!
//! - Requests that fail validation return an error result without touching
//!   any provider or the audit log.
//! - Providers are built per call, inside the retry loop, so an unused
//!   capability can never break startup and rotated secrets are picked up.
//! - A request-level `provider` override pins the call to that provider;
//!   configured fallbacks only apply when the provider came from
//!   configuration or the built-in default.
//! - Each provider tried produces one audit record covering all of its
//!   retry attempts.

pub mod request;
pub mod result;

pub use request::{
    DeleteRequest, DownloadRequest, EmailRequest, EmailStatusRequest, EnvelopeRequest,
    EnvelopeStatusRequest, IndexRequest, LetterRequest, LetterStatusRequest, ListRequest,
    OperationRequest, SearchRequest, UploadRequest, VoidEnvelopeRequest,
};
pub use result::{OperationResult, Outcome};

use crate::audit::AuditLogger;
use crate::config::{GatewayConfig, ProviderConfig};
use crate::error::{Error, Result};
use crate::fallback::FallbackController;
use crate::registry::{ProviderFactory, ProviderRegistry};
use crate::retry::RetryPolicy;
use crate::secrets::SecretsResolver;
use crate::traits::{
    Capability, EmailProvider, PhysicalMailProvider, SearchProvider, SigningProvider,
    StatusInfo, StorageProvider,
};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Unified facade over every capability
///
/// Cheap to share behind an `Arc`; all operations take `&self`.
#[derive(Debug)]
pub struct Gateway {
    registry: Arc<ProviderRegistry>,
    config: GatewayConfig,
    secrets: SecretsResolver,
    retry: RetryPolicy,
    audit: AuditLogger,
    fallbacks: HashMap<Capability, FallbackController>,
}

/// Generates the typed "build a provider by name" helper for one capability
macro_rules! provider_builder {
    ($fn_name:ident, $variant:ident, $capability:expr, $provider:ty) => {
        async fn $fn_name(&self, name: &str) -> Result<Box<$provider>> {
            let config = self.provider_config($capability, name);
            match self.factory($capability, name)? {
                ProviderFactory::$variant(factory) => factory.create(&config).await,
                other => Err(Error::config(format!(
                    "'{}' is registered as a {} provider, not {}",
                    name,
                    other.capability(),
                    $capability
                ))),
            }
        }
    };
}

impl Gateway {
    /// Build a gateway from configuration
    ///
    /// Opens the audit log and builds the retry policy. Providers are not
    /// touched here.
    pub async fn from_config(registry: Arc<ProviderRegistry>, config: GatewayConfig) -> Result<Self> {
        let retry = RetryPolicy::from_config(&config.retry)?;
        let audit = AuditLogger::from_config(&config.audit).await?;
        let secrets = SecretsResolver::new(config.secrets_dir.clone());
        Ok(Self::new(registry, config, secrets, retry, audit))
    }

    /// Assemble a gateway from explicit parts
    pub fn new(
        registry: Arc<ProviderRegistry>,
        config: GatewayConfig,
        secrets: SecretsResolver,
        retry: RetryPolicy,
        audit: AuditLogger,
    ) -> Self {
        let fallbacks = Capability::ALL
            .into_iter()
            .map(|capability| (capability, FallbackController::new()))
            .collect();

        info!(
            "Gateway ready with {} registered providers",
            registry.len()
        );

        Self {
            registry,
            config,
            secrets,
            retry,
            audit,
            fallbacks,
        }
    }

    /// The provider registry
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// The merged configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// The audit logger, for queries and statistics
    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Chain index of the provider that last served `capability`
    pub fn current_provider_index(&self, capability: Capability) -> usize {
        self.fallbacks
            .get(&capability)
            .map(FallbackController::current_provider_index)
            .unwrap_or_default()
    }

    /// Ordered provider names tried for a call
    pub fn provider_chain(&self, capability: Capability, override_name: Option<&str>) -> Vec<String> {
        if let Some(name) = override_name {
            return vec![name.trim().to_string()];
        }

        let primary = self
            .config
            .provider_name(capability)
            .unwrap_or_else(|| capability.default_provider().to_string());

        let mut chain = vec![primary];
        for name in self.config.fallback_names(capability) {
            if !chain.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                chain.push(name);
            }
        }
        chain
    }

    // ---- Email ----------------------------------------------------------

    /// Send an email
    ///
    /// Payload: `message_id`, `provider_status`.
    pub async fn send_email(&self, request: &EmailRequest) -> OperationResult {
        let message = request.message();
        let message = &message;
        self.dispatch(Capability::Email, "send_email", request, |name| async move {
            let provider = self.email_provider(&name).await?;
            let receipt = provider.send(message).await?;
            Ok(payload(json!({
                "message_id": receipt.message_id,
                "provider_status": receipt.status,
            })))
        })
        .await
    }

    /// Look up an email's delivery status
    ///
    /// Payload: `message_id`, `provider_status` and provider details.
    pub async fn email_status(&self, request: &EmailStatusRequest) -> OperationResult {
        let id = request.message_id.as_str();
        self.dispatch(Capability::Email, "email_status", request, |name| async move {
            let provider = self.email_provider(&name).await?;
            let status = provider.get_status(id).await?;
            Ok(status_payload("message_id", id, status))
        })
        .await
    }

    // ---- Storage --------------------------------------------------------

    /// Upload a local file
    ///
    /// Payload: `url`, `bucket`, `object_name`.
    pub async fn upload_file(&self, request: &UploadRequest) -> OperationResult {
        let object_name = request.effective_object_name();
        let object_name = object_name.as_str();
        self.dispatch(Capability::Storage, "upload_file", request, |name| async move {
            let provider = self.storage_provider(&name).await?;
            let url = provider
                .upload(&request.file, &request.bucket, Some(object_name))
                .await?;
            Ok(payload(json!({
                "url": url,
                "bucket": request.bucket,
                "object_name": object_name,
            })))
        })
        .await
    }

    /// Download an object to a local path
    ///
    /// Payload: `path`, `bucket`, `object_name`.
    pub async fn download_file(&self, request: &DownloadRequest) -> OperationResult {
        self.dispatch(Capability::Storage, "download_file", request, |name| async move {
            let provider = self.storage_provider(&name).await?;
            let path = provider
                .download(&request.object_name, &request.bucket, &request.destination)
                .await?;
            Ok(payload(json!({
                "path": path.display().to_string(),
                "bucket": request.bucket,
                "object_name": request.object_name,
            })))
        })
        .await
    }

    /// Delete an object
    ///
    /// Payload: `deleted`, `bucket`, `object_name`.
    pub async fn delete_file(&self, request: &DeleteRequest) -> OperationResult {
        self.dispatch(Capability::Storage, "delete_file", request, |name| async move {
            let provider = self.storage_provider(&name).await?;
            let deleted = provider.delete(&request.object_name, &request.bucket).await?;
            Ok(payload(json!({
                "deleted": deleted,
                "bucket": request.bucket,
                "object_name": request.object_name,
            })))
        })
        .await
    }

    /// List objects in a bucket
    ///
    /// Payload: `files`, `count`, `bucket`.
    pub async fn list_files(&self, request: &ListRequest) -> OperationResult {
        self.dispatch(Capability::Storage, "list_files", request, |name| async move {
            let provider = self.storage_provider(&name).await?;
            let files = provider
                .list(&request.bucket, request.prefix.as_deref())
                .await?;
            Ok(payload(json!({
                "count": files.len(),
                "files": files,
                "bucket": request.bucket,
            })))
        })
        .await
    }

    // ---- Signing --------------------------------------------------------

    /// Create an envelope and send it for signature
    ///
    /// Payload: `envelope_id`.
    pub async fn create_envelope(&self, request: &EnvelopeRequest) -> OperationResult {
        self.dispatch(Capability::Signing, "create_envelope", request, |name| async move {
            let provider = self.signing_provider(&name).await?;
            let envelope_id = provider
                .create_envelope(&request.document, &request.signers, request.subject.as_deref())
                .await?;
            Ok(payload(json!({ "envelope_id": envelope_id })))
        })
        .await
    }

    /// Look up an envelope's status
    ///
    /// Payload: `envelope_id`, `provider_status` and provider details.
    pub async fn envelope_status(&self, request: &EnvelopeStatusRequest) -> OperationResult {
        let id = request.envelope_id.as_str();
        self.dispatch(Capability::Signing, "envelope_status", request, |name| async move {
            let provider = self.signing_provider(&name).await?;
            let status = provider.get_status(id).await?;
            Ok(status_payload("envelope_id", id, status))
        })
        .await
    }

    /// Void an envelope
    ///
    /// Payload: `envelope_id`, `voided`.
    pub async fn void_envelope(&self, request: &VoidEnvelopeRequest) -> OperationResult {
        self.dispatch(Capability::Signing, "void_envelope", request, |name| async move {
            let provider = self.signing_provider(&name).await?;
            let voided = provider.void(&request.envelope_id, &request.reason).await?;
            Ok(payload(json!({
                "envelope_id": request.envelope_id,
                "voided": voided,
            })))
        })
        .await
    }

    // ---- Search ---------------------------------------------------------

    /// Run a search query
    ///
    /// Payload: `results`, `count`.
    pub async fn search(&self, request: &SearchRequest) -> OperationResult {
        self.dispatch(Capability::Search, "search", request, |name| async move {
            let provider = self.search_provider(&name).await?;
            let results = provider
                .query(
                    &request.query,
                    &request.index,
                    request.filters.as_ref(),
                    request.limit,
                )
                .await?;
            Ok(payload(json!({
                "count": results.len(),
                "results": results,
            })))
        })
        .await
    }

    /// Index a document
    ///
    /// Payload: `id`, `index`, `indexed`.
    pub async fn index_document(&self, request: &IndexRequest) -> OperationResult {
        self.dispatch(Capability::Search, "index_document", request, |name| async move {
            let provider = self.search_provider(&name).await?;
            let indexed = provider
                .index_document(&request.id, &request.document, &request.index)
                .await?;
            Ok(payload(json!({
                "id": request.id,
                "index": request.index,
                "indexed": indexed,
            })))
        })
        .await
    }

    // ---- Physical mail --------------------------------------------------

    /// Send a printed letter
    ///
    /// Payload: `letter_id`.
    pub async fn send_letter(&self, request: &LetterRequest) -> OperationResult {
        self.dispatch(Capability::PhysicalMail, "send_letter", request, |name| async move {
            let provider = self.physical_mail_provider(&name).await?;
            let letter_id = provider
                .send_letter(
                    &request.to_address,
                    &request.from_address,
                    &request.content,
                    request.color,
                )
                .await?;
            Ok(payload(json!({ "letter_id": letter_id })))
        })
        .await
    }

    /// Look up a letter's status
    ///
    /// Payload: `letter_id`, `provider_status` and provider details.
    pub async fn letter_status(&self, request: &LetterStatusRequest) -> OperationResult {
        let id = request.letter_id.as_str();
        self.dispatch(Capability::PhysicalMail, "letter_status", request, |name| async move {
            let provider = self.physical_mail_provider(&name).await?;
            let status = provider.get_status(id).await?;
            Ok(status_payload("letter_id", id, status))
        })
        .await
    }

    // ---- Internals ------------------------------------------------------

    /// Validate, then run `operation` across the provider chain
    ///
    /// `operation` receives a provider name and performs one complete
    /// attempt against it. This is the only place errors become results.
    async fn dispatch<R, F, Fut>(
        &self,
        capability: Capability,
        method: &str,
        request: &R,
        operation: F,
    ) -> OperationResult
    where
        R: OperationRequest,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<Map<String, Value>>>,
    {
        if let Err(e) = request.validate() {
            debug!("Rejected {} request: {}", method, e);
            return OperationResult::error(None, e.to_string());
        }

        let chain = self.provider_chain(capability, request.provider_override());
        let audit_fields = request.audit_fields();
        let operation = &operation;
        let audit_fields = &audit_fields;

        let Some(fallback) = self.fallbacks.get(&capability) else {
            return OperationResult::error(None, format!("No fallback controller for {}", capability));
        };

        let outcome = fallback
            .execute(&chain, |name| async move {
                let started = Instant::now();
                let result = self.retry.execute(|| operation(name.clone())).await;

                match &result {
                    Ok(payload) => {
                        self.audit
                            .log_call(
                                &name,
                                method,
                                audit_fields,
                                Some(Value::Object(payload.clone())),
                                None,
                                started.elapsed(),
                            )
                            .await;
                    }
                    Err(e) => {
                        self.audit
                            .log_call(
                                &name,
                                method,
                                audit_fields,
                                None,
                                Some(&e.to_string()),
                                started.elapsed(),
                            )
                            .await;
                    }
                }

                result
            })
            .await;

        match outcome {
            Ok(served) => OperationResult::success(served.provider, served.value),
            Err(e) => OperationResult::error(chain.last().cloned(), e.to_string()),
        }
    }

    fn factory(&self, capability: Capability, name: &str) -> Result<&ProviderFactory> {
        self.registry.resolve(capability, name).ok_or_else(|| {
            let known: Vec<String> = self.registry.list_names(capability).into_iter().collect();
            Error::config(format!(
                "No {} provider registered as '{}' (registered: {})",
                capability,
                name,
                if known.is_empty() {
                    "none".to_string()
                } else {
                    known.join(", ")
                }
            ))
        })
    }

    /// Settings for a provider with secret references resolved
    fn provider_config(&self, capability: Capability, name: &str) -> ProviderConfig {
        let mut config = self.config.provider_config(capability, name);
        self.secrets.resolve_references(&mut config.values);
        config
    }

    provider_builder!(email_provider, Email, Capability::Email, dyn EmailProvider);
    provider_builder!(storage_provider, Storage, Capability::Storage, dyn StorageProvider);
    provider_builder!(signing_provider, Signing, Capability::Signing, dyn SigningProvider);
    provider_builder!(search_provider, Search, Capability::Search, dyn SearchProvider);
    provider_builder!(
        physical_mail_provider,
        PhysicalMail,
        Capability::PhysicalMail,
        dyn PhysicalMailProvider
    );
}

fn payload(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn status_payload(id_key: &str, id: &str, status: StatusInfo) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(id_key.to_string(), Value::String(id.to_string()));
    map.insert("provider_status".to_string(), Value::String(status.status));
    for (key, value) in status.details {
        map.entry(key).or_insert(value);
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::providers::register_builtin;
    use crate::retry::InstantSleeper;

    fn gateway(tree: Value) -> (Gateway, MemoryAuditSink) {
        let mut registry = ProviderRegistry::new();
        register_builtin(&mut registry);

        let sink = MemoryAuditSink::new();
        let config = GatewayConfig::from_value(tree).unwrap();
        let gateway = Gateway::new(
            Arc::new(registry),
            config,
            SecretsResolver::with_env("unused", Arc::new(HashMap::<String, String>::new())),
            RetryPolicy::default().with_sleeper(Arc::new(InstantSleeper)),
            AuditLogger::new(Arc::new(sink.clone())),
        );
        (gateway, sink)
    }

    #[test]
    fn test_provider_chain_resolution() {
        let (gateway, _) = gateway(json!({
            "providers": {"email": {"provider": "dummy", "fallback": ["backup", "DUMMY"]}}
        }));

        assert_eq!(gateway.provider_chain(Capability::Email, None), vec!["dummy", "backup"]);
        assert_eq!(gateway.provider_chain(Capability::Email, Some("other")), vec!["other"]);
        assert_eq!(gateway.provider_chain(Capability::Storage, None), vec!["s3"]);
    }

    #[tokio::test]
    async fn test_unregistered_default_is_configuration_error() {
        let (gateway, sink) = gateway(json!({}));

        let result = gateway
            .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello"))
            .await;

        assert!(!result.is_success());
        assert_eq!(result.provider(), Some("sendgrid"));
        assert!(result.error_message().unwrap().contains("sendgrid"));
        // Exactly one attempt: configuration errors are not retried
        assert_eq!(sink.len().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_envelope_is_reported() {
        let (gateway, _) = gateway(json!({"providers": {"signing": {"provider": "dummy"}}}));

        let result = gateway
            .envelope_status(&EnvelopeStatusRequest {
                envelope_id: "env-1".into(),
                ..EnvelopeStatusRequest::default()
            })
            .await;

        assert!(!result.is_success());
        assert!(result.error_message().unwrap().contains("env-1"));
    }
}
