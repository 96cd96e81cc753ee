//! Layered secret lookup
//!
//! Provider credentials are referenced from configuration by a slash-delimited
//! path such as `email/sendgrid_api_key`. Resolution order:
//!
//! 1. Process environment, under the reference upper-cased with `/` turned
//!    into `_` (`EMAIL/SENDGRID_API_KEY` becomes `EMAIL_SENDGRID_API_KEY`).
//! 2. A local JSON secret store: the first path segment names a file
//!    (`<secrets_dir>/email.json`) and the remaining segments are a nested
//!    key path inside it. A reference with a single segment is looked up in
//!    `<secrets_dir>/secrets.json`.
//!
//! Nothing is cached. Secrets may rotate at any time, so every call re-reads.

use crate::env::{EnvSource, ProcessEnv};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Suffix marking a setting whose value is a secret reference
pub const SECRET_PATH_SUFFIX: &str = "_secret_path";

/// Default directory for the local secret store
pub const DEFAULT_SECRETS_DIR: &str = "secrets";

/// File consulted for single-segment references
const FLAT_SECRETS_FILE: &str = "secrets.json";

/// Read-only secret resolver
#[derive(Clone)]
pub struct SecretsResolver {
    secrets_dir: PathBuf,
    env: Arc<dyn EnvSource>,
}

impl std::fmt::Debug for SecretsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsResolver")
            .field("secrets_dir", &self.secrets_dir)
            .finish()
    }
}

impl SecretsResolver {
    /// Create a resolver reading the process environment and `secrets_dir`
    pub fn new(secrets_dir: impl Into<PathBuf>) -> Self {
        Self::with_env(secrets_dir, Arc::new(ProcessEnv))
    }

    /// Create a resolver with an explicit environment source
    pub fn with_env(secrets_dir: impl Into<PathBuf>, env: Arc<dyn EnvSource>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
            env,
        }
    }

    /// Directory holding the local secret files
    pub fn secrets_dir(&self) -> &Path {
        &self.secrets_dir
    }

    /// Resolve a secret reference
    ///
    /// Returns `None` when no layer knows the reference. Whether a missing
    /// secret is fatal is up to the caller.
    pub fn get_secret(&self, reference: &str) -> Option<String> {
        let reference = reference.trim_matches('/');
        if reference.is_empty() {
            return None;
        }

        let env_key = env_key(reference);
        if let Some(value) = self.env.var(&env_key) {
            debug!("Secret {} resolved from environment", reference);
            return Some(value);
        }

        let value = self.lookup_file(reference);
        if value.is_some() {
            debug!("Secret {} resolved from local store", reference);
        }
        value
    }

    /// Replace `<key>_secret_path` settings with the resolved `<key>`
    ///
    /// A literal `<key>` already present wins and the reference is ignored.
    /// Every `_secret_path` entry is removed. Unresolvable references leave
    /// `<key>` unset; the provider decides if that is fatal.
    pub fn resolve_references(&self, values: &mut Map<String, Value>) {
        let references: Vec<(String, String)> = values
            .iter()
            .filter_map(|(key, value)| {
                let target = key.strip_suffix(SECRET_PATH_SUFFIX)?;
                Some((target.to_string(), value.as_str()?.to_string()))
            })
            .collect();

        values.retain(|key, _| !key.ends_with(SECRET_PATH_SUFFIX));

        for (target, reference) in references {
            let literal = values
                .get(&target)
                .and_then(Value::as_str)
                .is_some_and(|v| !v.is_empty());
            if literal {
                continue;
            }
            match self.get_secret(&reference) {
                Some(secret) => {
                    values.insert(target, Value::String(secret));
                }
                None => warn!("Secret {} could not be resolved for '{}'", reference, target),
            }
        }
    }

    fn lookup_file(&self, reference: &str) -> Option<String> {
        let mut segments = reference.split('/');
        let first = segments.next()?;
        let rest: Vec<&str> = segments.collect();

        let (file_name, key_path) = if rest.is_empty() {
            (FLAT_SECRETS_FILE.to_string(), vec![first])
        } else {
            (format!("{}.json", first), rest)
        };

        let path = self.secrets_dir.join(file_name);
        if !path.exists() {
            return None;
        }

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                warn!("Failed to read secret file {}: {}", path.display(), e);
                return None;
            }
        };

        let data: Value = match serde_json::from_str(&content) {
            Ok(data) => data,
            Err(e) => {
                warn!("Secret file {} is not valid JSON: {}", path.display(), e);
                return None;
            }
        };

        let mut current = &data;
        for key in key_path {
            current = current.get(key)?;
        }

        current.as_str().map(str::to_string)
    }
}

/// Normalize a reference into its environment variable name
fn env_key(reference: &str) -> String {
    reference.to_uppercase().replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn env(pairs: &[(&str, &str)]) -> Arc<dyn EnvSource> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Arc::new(map)
    }

    #[test]
    fn test_env_key_normalization() {
        assert_eq!(env_key("email/sendgrid_api_key"), "EMAIL_SENDGRID_API_KEY");
        assert_eq!(env_key("test_secret_key"), "TEST_SECRET_KEY");
    }

    #[test]
    fn test_environment_wins_over_file() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("email.json"),
            r#"{"sendgrid_api_key": "from-file"}"#,
        )
        .unwrap();

        let resolver = SecretsResolver::with_env(
            dir.path(),
            env(&[("EMAIL_SENDGRID_API_KEY", "from-env")]),
        );

        assert_eq!(
            resolver.get_secret("email/sendgrid_api_key").as_deref(),
            Some("from-env")
        );
    }

    #[test]
    fn test_file_lookup_nested_path() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("storage.json"),
            r#"{"s3": {"secret_access_key": "nested-value"}, "flat": "v"}"#,
        )
        .unwrap();

        let resolver = SecretsResolver::with_env(dir.path(), env(&[]));

        assert_eq!(
            resolver.get_secret("storage/s3/secret_access_key").as_deref(),
            Some("nested-value")
        );
        assert_eq!(resolver.get_secret("storage/flat").as_deref(), Some("v"));
        // Pointing at a mapping is not a secret value
        assert_eq!(resolver.get_secret("storage/s3"), None);
        assert_eq!(resolver.get_secret("storage/s3/missing"), None);
    }

    #[test]
    fn test_single_segment_uses_flat_file() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("secrets.json"), r#"{"master": "m"}"#).unwrap();

        let resolver = SecretsResolver::with_env(dir.path(), env(&[]));
        assert_eq!(resolver.get_secret("master").as_deref(), Some("m"));
    }

    #[test]
    fn test_unresolved_is_absent_not_error() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("email.json"), b"not json").unwrap();

        let resolver = SecretsResolver::with_env(dir.path(), env(&[]));
        assert_eq!(resolver.get_secret("email/key"), None);
        assert_eq!(resolver.get_secret("nothing/here"), None);
        assert_eq!(resolver.get_secret(""), None);
    }

    #[test]
    fn test_resolve_references() {
        let dir = tempdir().unwrap();
        let resolver = SecretsResolver::with_env(
            dir.path(),
            env(&[("EMAIL_SENDGRID_API_KEY", "sg-secret"), ("EMAIL_OTHER", "unused")]),
        );

        let mut values = Map::new();
        values.insert("api_key_secret_path".into(), "email/sendgrid_api_key".into());
        values.insert("domain".into(), "example.com".into());
        values.insert("token".into(), "literal".into());
        values.insert("token_secret_path".into(), "email/other".into());
        values.insert("missing_secret_path".into(), "nowhere/at_all".into());

        resolver.resolve_references(&mut values);

        assert_eq!(values["api_key"], "sg-secret");
        assert_eq!(values["token"], "literal");
        assert_eq!(values["domain"], "example.com");
        assert!(!values.contains_key("missing"));
        assert!(values.keys().all(|k| !k.ends_with(SECRET_PATH_SUFFIX)));
    }

    #[test]
    fn test_rotation_is_visible_without_restart() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sign.json");
        std::fs::write(&path, r#"{"token": "old"}"#).unwrap();

        let resolver = SecretsResolver::with_env(dir.path(), env(&[]));
        assert_eq!(resolver.get_secret("sign/token").as_deref(), Some("old"));

        std::fs::write(&path, r#"{"token": "new"}"#).unwrap();
        assert_eq!(resolver.get_secret("sign/token").as_deref(), Some("new"));
    }
}
