//! Plugin-based provider registry
//!
//! The registry maps a logical provider name to the factory that builds it,
//! per capability, avoiding hardcoded if-else chains in the gateway.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use conduit_core::registry::{ProviderFactory, ProviderRegistry};
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register("sendgrid", ProviderFactory::email(SendgridFactory));
//!
//! // Share read-only once registration is done
//! let registry = std::sync::Arc::new(registry);
//! ```
//!
//! ## Registration
//!
//! Implementations should register themselves during initialization:
//!
//! ```rust,ignore
//! // In conduit-provider-local
//! pub fn register(registry: &mut ProviderRegistry) {
//!     registry.register("local", ProviderFactory::storage(LocalStorageFactory));
//! }
//! ```
//!
//! Registration is a startup-only mutation. Once the registry is wrapped in
//! an `Arc` and handed to the [`Gateway`](crate::Gateway) it is read-only,
//! so lookups take no lock.

use crate::traits::{
    Capability, EmailProviderFactory, PhysicalMailProviderFactory, SearchProviderFactory,
    SigningProviderFactory, StorageProviderFactory,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A capability-bound provider constructor
///
/// One variant per capability keeps each factory statically typed against
/// its capability trait while the registry stays a single open map.
#[derive(Clone)]
pub enum ProviderFactory {
    /// Email provider factory
    Email(Arc<dyn EmailProviderFactory>),
    /// Storage provider factory
    Storage(Arc<dyn StorageProviderFactory>),
    /// Signing provider factory
    Signing(Arc<dyn SigningProviderFactory>),
    /// Search provider factory
    Search(Arc<dyn SearchProviderFactory>),
    /// Physical mail provider factory
    PhysicalMail(Arc<dyn PhysicalMailProviderFactory>),
}

impl ProviderFactory {
    /// Wrap an email factory
    pub fn email(factory: impl EmailProviderFactory + 'static) -> Self {
        Self::Email(Arc::new(factory))
    }

    /// Wrap a storage factory
    pub fn storage(factory: impl StorageProviderFactory + 'static) -> Self {
        Self::Storage(Arc::new(factory))
    }

    /// Wrap a signing factory
    pub fn signing(factory: impl SigningProviderFactory + 'static) -> Self {
        Self::Signing(Arc::new(factory))
    }

    /// Wrap a search factory
    pub fn search(factory: impl SearchProviderFactory + 'static) -> Self {
        Self::Search(Arc::new(factory))
    }

    /// Wrap a physical mail factory
    pub fn physical_mail(factory: impl PhysicalMailProviderFactory + 'static) -> Self {
        Self::PhysicalMail(Arc::new(factory))
    }

    /// The capability this factory builds providers for
    pub fn capability(&self) -> Capability {
        match self {
            Self::Email(_) => Capability::Email,
            Self::Storage(_) => Capability::Storage,
            Self::Signing(_) => Capability::Signing,
            Self::Search(_) => Capability::Search,
            Self::PhysicalMail(_) => Capability::PhysicalMail,
        }
    }
}

impl std::fmt::Debug for ProviderFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ProviderFactory")
            .field(&self.capability())
            .finish()
    }
}

/// Provider registry for plugin-based provider creation
#[derive(Debug, Default)]
pub struct ProviderRegistry {
    factories: HashMap<Capability, HashMap<String, ProviderFactory>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider factory under `name`
    ///
    /// Names are case-insensitive. Registering a name again for the same
    /// capability replaces the earlier factory without complaint.
    pub fn register(&mut self, name: impl AsRef<str>, factory: ProviderFactory) {
        let name = normalize(name.as_ref());
        let capability = factory.capability();
        debug!("Registering {} provider '{}'", capability, name);
        self.factories
            .entry(capability)
            .or_default()
            .insert(name, factory);
    }

    /// Look up a factory
    ///
    /// Returns `None` for unknown names; callers turn that into a
    /// configuration error with whatever context they have.
    pub fn resolve(&self, capability: Capability, name: &str) -> Option<&ProviderFactory> {
        self.factories
            .get(&capability)
            .and_then(|by_name| by_name.get(&normalize(name)))
    }

    /// Check if a provider name is registered for a capability
    pub fn contains(&self, capability: Capability, name: &str) -> bool {
        self.resolve(capability, name).is_some()
    }

    /// Registered names for one capability
    pub fn list_names(&self, capability: Capability) -> BTreeSet<String> {
        self.factories
            .get(&capability)
            .map(|by_name| by_name.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Registered names for every capability that has at least one provider
    pub fn list_all(&self) -> BTreeMap<Capability, BTreeSet<String>> {
        Capability::ALL
            .into_iter()
            .map(|capability| (capability, self.list_names(capability)))
            .filter(|(_, names)| !names.is_empty())
            .collect()
    }

    /// Total number of registered factories
    pub fn len(&self) -> usize {
        self.factories.values().map(HashMap::len).sum()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::error::{Error, Result};
    use crate::traits::SearchProvider;
    use async_trait::async_trait;

    struct MockSearchFactory;

    #[async_trait]
    impl SearchProviderFactory for MockSearchFactory {
        async fn create(&self, _config: &ProviderConfig) -> Result<Box<dyn SearchProvider>> {
            Err(Error::not_found("Mock provider not implemented"))
        }
    }

    #[test]
    fn test_registry_registration() {
        let mut registry = ProviderRegistry::new();

        // Initially empty
        assert!(registry.is_empty());
        assert!(!registry.contains(Capability::Search, "mock"));

        registry.register("Mock", ProviderFactory::search(MockSearchFactory));

        // Lookup ignores case, and the capability must match
        assert!(registry.contains(Capability::Search, "MOCK"));
        assert!(!registry.contains(Capability::Email, "mock"));
        assert!(registry.list_names(Capability::Search).contains("mock"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_list_all_skips_empty_capabilities() {
        let mut registry = ProviderRegistry::new();
        registry.register("mock", ProviderFactory::search(MockSearchFactory));

        let all = registry.list_all();
        assert_eq!(all.len(), 1);
        assert!(all[&Capability::Search].contains("mock"));
    }
}
