//! Configuration types for the conduit gateway
//!
//! Configuration is a tree of mappings merged from several layers, later
//! layers overriding earlier ones at the leaf-key level:
//!
//! 1. `shared_config.yaml` (shared defaults)
//! 2. `<environment>/api_config.yaml` (environment-specific overrides)
//! 3. environment variables
//! 4. explicit per-call overrides (applied by the gateway, not here)
//!
//! ## Layout
//!
//! ```yaml
//! providers:
//!   email:
//!     provider: sendgrid            # selected provider
//!     fallback: [mailgun]           # tried in order if the selected one fails
//!     sendgrid:
//!       api_key_secret_path: email/sendgrid_api_key
//!     mailgun:
//!       domain: mg.example.com
//! retry:
//!   max_retries: 3
//!   base_delay_secs: 1.0
//! audit:
//!   log_file: logs/api_call_logs.jsonl
//! ```

use crate::env::{EnvSource, ProcessEnv};
use crate::error::{Error, Result};
use crate::secrets::DEFAULT_SECRETS_DIR;
use crate::traits::Capability;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Shared defaults file name
pub const SHARED_CONFIG_FILE: &str = "shared_config.yaml";

/// Environment-specific file name, looked up under `<config_dir>/<environment>/`
pub const ENV_CONFIG_FILE: &str = "api_config.yaml";

/// Environment used when `ENVIRONMENT` is unset
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Keys at the capability level that describe selection, not provider settings
const SELECTION_KEYS: &[&str] = &["provider", "type", "fallback"];

/// Resolved gateway configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    tree: Value,

    /// Retry policy settings
    pub retry: RetryConfig,

    /// Audit log settings
    pub audit: AuditConfig,

    /// Directory of the local secret store
    pub secrets_dir: PathBuf,
}

impl GatewayConfig {
    /// Build a configuration from an already merged tree
    pub fn from_value(tree: Value) -> Result<Self> {
        let tree = match tree {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => tree,
            other => {
                return Err(Error::config(format!(
                    "Configuration root must be a mapping, got {}",
                    other
                )));
            }
        };

        let retry = match tree.get("retry") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::config(format!("Invalid retry settings: {}", e)))?,
            None => RetryConfig::default(),
        };

        let audit = match tree.get("audit") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| Error::config(format!("Invalid audit settings: {}", e)))?,
            None => AuditConfig::default(),
        };

        let secrets_dir = tree
            .get("secrets")
            .and_then(|s| s.get("dir"))
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_DIR));

        Ok(Self {
            tree,
            retry,
            audit,
            secrets_dir,
        })
    }

    /// The merged configuration tree
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Look up a value by dot-separated path (e.g. `providers.email.provider`)
    pub fn get(&self, path: &str) -> Option<&Value> {
        path.split('.')
            .try_fold(&self.tree, |node, key| node.as_object()?.get(key))
    }

    /// Set a value by dot-separated path, creating intermediate mappings
    pub fn set(&mut self, path: &str, value: Value) {
        set_path(&mut self.tree, path, value);
    }

    /// The configured provider name for a capability, if any
    ///
    /// `type` is accepted as an alias of `provider`.
    pub fn provider_name(&self, capability: Capability) -> Option<String> {
        let section = self.capability_section(capability)?;
        section
            .get("provider")
            .or_else(|| section.get("type"))
            .and_then(Value::as_str)
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
    }

    /// Ordered fallback provider names for a capability
    pub fn fallback_names(&self, capability: Capability) -> Vec<String> {
        let Some(section) = self.capability_section(capability) else {
            return Vec::new();
        };

        match section.get("fallback") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(list)) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Settings for one provider of a capability
    ///
    /// Starts from the capability-level scalar settings (shared by every
    /// provider of the capability) and overlays the provider's own subtree
    /// (`providers.<capability>.<name>`), so provider-specific values win.
    pub fn provider_config(&self, capability: Capability, name: &str) -> ProviderConfig {
        let mut values = Map::new();

        if let Some(section) = self.capability_section(capability) {
            for (key, value) in section {
                if SELECTION_KEYS.contains(&key.as_str()) || value.is_object() {
                    continue;
                }
                values.insert(key.clone(), value.clone());
            }

            if let Some(own) = provider_subtree_key(section, name)
                .and_then(|key| section.get(key))
                .and_then(Value::as_object)
            {
                values.extend(own.clone());
            }
        }

        ProviderConfig::new(capability, name, values)
    }

    fn capability_section(&self, capability: Capability) -> Option<&Map<String, Value>> {
        self.tree
            .get("providers")?
            .get(capability.as_str())?
            .as_object()
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            tree: Value::Object(Map::new()),
            retry: RetryConfig::default(),
            audit: AuditConfig::default(),
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
        }
    }
}

/// Settings handed to a provider factory
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    /// Capability the provider serves
    pub capability: Capability,

    /// Logical provider name
    pub name: String,

    /// Provider settings, secrets already resolved
    pub values: Map<String, Value>,
}

impl ProviderConfig {
    /// Create a provider configuration
    pub fn new(capability: Capability, name: impl Into<String>, values: Map<String, Value>) -> Self {
        Self {
            capability,
            name: name.into(),
            values,
        }
    }

    /// Get a string setting
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(Value::as_str)
    }

    /// Get a string setting, failing with a configuration error if absent or empty
    pub fn require_str(&self, key: &str) -> Result<&str> {
        self.get_str(key)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "{} provider '{}' requires setting '{}'",
                    self.capability, self.name, key
                ))
            })
    }

    /// Get a boolean setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(Value::as_bool)
    }
}

/// Retry policy settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 means a single attempt)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry (in seconds)
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: f64,

    /// Upper bound for any single delay (in seconds)
    #[serde(default = "default_max_delay_secs")]
    pub max_delay_secs: f64,

    /// Multiplier applied per attempt
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// Add up to 25% random extra delay
    #[serde(default = "default_jitter")]
    pub jitter: bool,

    /// Optional overall budget for one retry-wrapped call (in seconds)
    #[serde(default)]
    pub deadline_secs: Option<f64>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_secs: default_base_delay_secs(),
            max_delay_secs: default_max_delay_secs(),
            backoff_factor: default_backoff_factor(),
            jitter: default_jitter(),
            deadline_secs: None,
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_base_delay_secs() -> f64 {
    1.0
}

fn default_max_delay_secs() -> f64 {
    60.0
}

fn default_backoff_factor() -> f64 {
    2.0
}

fn default_jitter() -> bool {
    true
}

/// Audit log settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Whether calls are recorded at all
    #[serde(default = "default_audit_enabled")]
    pub enabled: bool,

    /// Path of the JSONL audit file
    #[serde(default = "default_audit_log_file")]
    pub log_file: PathBuf,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: default_audit_enabled(),
            log_file: default_audit_log_file(),
        }
    }
}

fn default_audit_enabled() -> bool {
    true
}

fn default_audit_log_file() -> PathBuf {
    PathBuf::from("logs").join("api_call_logs.jsonl")
}

/// Loads and merges the configuration layers
pub struct ConfigLoader {
    config_dir: PathBuf,
    environment: Option<String>,
    env: Arc<dyn EnvSource>,
}

impl ConfigLoader {
    /// Create a loader for a configuration directory
    pub fn new(config_dir: impl Into<PathBuf>) -> Self {
        Self {
            config_dir: config_dir.into(),
            environment: None,
            env: Arc::new(ProcessEnv),
        }
    }

    /// Use an explicit environment source instead of the process environment
    pub fn with_env(mut self, env: Arc<dyn EnvSource>) -> Self {
        self.env = env;
        self
    }

    /// Use an explicit environment name instead of `ENVIRONMENT`
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// The environment name that will be loaded
    pub fn environment(&self) -> String {
        self.environment
            .clone()
            .or_else(|| self.env.var("ENVIRONMENT"))
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
    }

    /// Load, merge and validate all layers
    pub fn load(&self) -> Result<GatewayConfig> {
        let mut tree = Value::Object(Map::new());

        if let Some(shared) = load_yaml(&self.config_dir.join(SHARED_CONFIG_FILE))? {
            deep_merge(&mut tree, shared);
        }

        let environment = self.environment();
        let env_path = self.config_dir.join(&environment).join(ENV_CONFIG_FILE);
        if let Some(env_layer) = load_yaml(&env_path)? {
            deep_merge(&mut tree, env_layer);
        }

        self.apply_env_overrides(&mut tree);

        info!(
            "Configuration loaded from {} (environment: {})",
            self.config_dir.display(),
            environment
        );

        GatewayConfig::from_value(tree)
    }

    fn apply_env_overrides(&self, tree: &mut Value) {
        for capability in Capability::ALL {
            let upper = capability.as_str().to_uppercase();

            let provider = self
                .env
                .var(&format!("API_PROVIDERS_{}_PROVIDER", upper))
                .or_else(|| self.env.var(&format!("{}_PROVIDER", upper)));
            if let Some(provider) = provider.filter(|p| !p.is_empty()) {
                debug!("Environment selects {} provider {}", capability, provider);
                set_path(
                    tree,
                    &format!("providers.{}.provider", capability.as_str()),
                    Value::String(provider),
                );
            }

            if let Some(api_key) = self
                .env
                .var(&format!("{}_API_KEY", upper))
                .filter(|k| !k.is_empty())
            {
                let selected = selected_provider(tree, capability);
                debug!("Environment sets api_key for {} provider {}", capability, selected);
                set_path(
                    tree,
                    &format!("providers.{}.{}.api_key", capability.as_str(), selected),
                    Value::String(api_key),
                );
            }
        }
    }
}

/// Key of the provider subtree matching `name`, compared case-insensitively
fn provider_subtree_key<'a>(section: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    section
        .iter()
        .find(|(key, value)| value.is_object() && key.eq_ignore_ascii_case(name))
        .map(|(key, _)| key.as_str())
}

/// Subtree key of the provider currently selected for `capability`
///
/// Reuses an existing subtree's spelling so the override lands where
/// [`GatewayConfig::provider_config`] will look.
fn selected_provider(tree: &Value, capability: Capability) -> String {
    let section = tree
        .get("providers")
        .and_then(|p| p.get(capability.as_str()))
        .and_then(Value::as_object);

    let name = section
        .and_then(|s| s.get("provider").or_else(|| s.get("type")))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| capability.default_provider());

    match section.and_then(|s| provider_subtree_key(s, name)) {
        Some(existing) => existing.to_string(),
        None => name.to_lowercase(),
    }
}

/// Read one YAML layer, `None` if the file does not exist or is empty
fn load_yaml(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        debug!("Configuration layer not present: {}", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let value: Value = serde_yaml::from_str(&content)?;
    match value {
        Value::Null => Ok(None),
        Value::Object(_) => Ok(Some(value)),
        _ => Err(Error::config(format!(
            "Configuration file {} must contain a mapping",
            path.display()
        ))),
    }
}

/// Merge `overlay` into `base` at the leaf-key level
///
/// Mappings present on both sides are merged recursively; anything else in
/// `overlay` replaces the value in `base`.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        deep_merge(existing, value);
                    }
                    _ => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn set_path(tree: &mut Value, path: &str, value: Value) {
    let mut node = tree;
    let mut keys = path.split('.').peekable();

    while let Some(key) = keys.next() {
        if !node.is_object() {
            *node = Value::Object(Map::new());
        }
        let Value::Object(map) = node else {
            return;
        };

        if keys.peek().is_none() {
            map.insert(key.to_string(), value);
            return;
        }

        node = map
            .entry(key.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}
