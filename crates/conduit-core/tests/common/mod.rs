//! Test doubles and common utilities for gateway contract tests
//!
//! The doubles count every call so tests can assert exactly how many times
//! the retry and fallback layers invoked a provider.

#![allow(dead_code)]

use async_trait::async_trait;
use conduit_core::audit::{AuditLogger, MemoryAuditSink};
use conduit_core::config::{GatewayConfig, ProviderConfig};
use conduit_core::error::{Error, Result};
use conduit_core::providers::register_builtin;
use conduit_core::registry::{ProviderFactory, ProviderRegistry};
use conduit_core::retry::{InstantSleeper, RetryPolicy, Sleeper};
use conduit_core::secrets::SecretsResolver;
use conduit_core::traits::{
    EmailMessage, EmailProvider, EmailProviderFactory, EmailReceipt, StatusInfo,
};
use conduit_core::Gateway;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// How a scripted provider answers
#[derive(Debug, Clone)]
pub enum Script {
    /// Always succeed
    Succeed,
    /// Fail transiently this many times, then succeed
    FailTimes(usize),
    /// Always fail transiently
    AlwaysTransient,
    /// Always fail permanently
    AlwaysPermanent,
}

/// Shared call counters for one scripted provider
#[derive(Debug, Clone, Default)]
pub struct Counters {
    creates: Arc<AtomicUsize>,
    sends: Arc<AtomicUsize>,
}

impl Counters {
    /// Number of times the factory built a provider
    pub fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of `send` invocations
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }
}

/// Email factory whose providers follow a [`Script`]
#[derive(Debug, Clone)]
pub struct ScriptedEmailFactory {
    name: String,
    script: Script,
    counters: Counters,
    last_config: Arc<std::sync::Mutex<Option<ProviderConfig>>>,
}

impl ScriptedEmailFactory {
    pub fn new(name: &str, script: Script) -> Self {
        Self {
            name: name.to_string(),
            script,
            counters: Counters::default(),
            last_config: Arc::new(std::sync::Mutex::new(None)),
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Configuration passed to the most recent `create`
    pub fn last_config(&self) -> Option<ProviderConfig> {
        self.last_config.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailProviderFactory for ScriptedEmailFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn EmailProvider>> {
        self.counters.creates.fetch_add(1, Ordering::SeqCst);
        *self.last_config.lock().unwrap() = Some(config.clone());
        Ok(Box::new(ScriptedEmailProvider {
            name: self.name.clone(),
            script: self.script.clone(),
            counters: self.counters.clone(),
        }))
    }
}

/// Provider built by [`ScriptedEmailFactory`]
pub struct ScriptedEmailProvider {
    name: String,
    script: Script,
    counters: Counters,
}

#[async_trait]
impl EmailProvider for ScriptedEmailProvider {
    async fn send(&self, _message: &EmailMessage) -> Result<EmailReceipt> {
        let call = self.counters.sends.fetch_add(1, Ordering::SeqCst);
        let ok = match self.script {
            Script::Succeed => true,
            Script::FailTimes(n) => call >= n,
            Script::AlwaysTransient => false,
            Script::AlwaysPermanent => {
                return Err(Error::permanent(&self.name, "recipient rejected"));
            }
        };

        if ok {
            Ok(EmailReceipt {
                message_id: format!("{}-{}", self.name, call),
                status: "sent".to_string(),
            })
        } else {
            Err(Error::transient(&self.name, format!("unavailable (call {})", call)))
        }
    }

    async fn get_status(&self, _message_id: &str) -> Result<StatusInfo> {
        Ok(StatusInfo::new("delivered"))
    }

    fn provider_name(&self) -> &str {
        &self.name
    }
}

/// Registry with the built-in providers plus the given email factories
pub fn registry_with(emails: &[(&str, ScriptedEmailFactory)]) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();
    register_builtin(&mut registry);
    for (name, factory) in emails {
        registry.register(name, ProviderFactory::email(factory.clone()));
    }
    registry
}

/// Environment with no variables set
pub fn empty_env() -> Arc<HashMap<String, String>> {
    Arc::new(HashMap::new())
}

/// Gateway over `registry` and the configuration `tree`, auditing to memory
pub fn gateway(
    registry: ProviderRegistry,
    tree: Value,
    sleeper: Arc<dyn Sleeper>,
) -> (Gateway, MemoryAuditSink) {
    let config = GatewayConfig::from_value(tree).unwrap();
    let retry = RetryPolicy::from_config(&config.retry)
        .unwrap()
        .with_sleeper(sleeper);
    let sink = MemoryAuditSink::new();
    let secrets = SecretsResolver::with_env(config.secrets_dir.clone(), empty_env());

    let gateway = Gateway::new(
        Arc::new(registry),
        config,
        secrets,
        retry,
        AuditLogger::new(Arc::new(sink.clone())),
    );
    (gateway, sink)
}

/// Same as [`gateway`] with a sleeper that returns at once
pub fn instant_gateway(registry: ProviderRegistry, tree: Value) -> (Gateway, MemoryAuditSink) {
    gateway(registry, tree, Arc::new(InstantSleeper))
}
