// # Local Providers
//
// Providers that need no vendor account, for development, tests and small
// single-host deployments:
//
// - `local` storage: buckets are directories under a configured root and
//   objects are files inside them
// - `memory` search: a process-local index with term-count ranking
//
// ## Provider Rules
//
// Like every provider these perform one operation per call. Retry, backoff
// and failover belong to the gateway, so failures are returned as errors:
// transient for I/O trouble, permanent for requests that can never succeed
// (such as an object name escaping its bucket).
//
// ## Configuration
//
// ```yaml
// providers:
//   storage:
//     provider: local
//     local:
//       root: /var/lib/conduit/objects
//       dry_run: false
//   search:
//     provider: memory
//     memory:
//       max_results: 100
// ```

pub mod search;
pub mod storage;

pub use search::{MemorySearchFactory, MemorySearchProvider};
pub use storage::{LocalStorageFactory, LocalStorageProvider};

use conduit_core::registry::{ProviderFactory, ProviderRegistry};

/// Registered name of the filesystem storage provider
pub const LOCAL_STORAGE: &str = "local";

/// Registered name of the in-memory search provider
pub const MEMORY_SEARCH: &str = "memory";

/// Register the local providers with a registry
///
/// # Example
///
/// ```rust
/// use conduit_core::ProviderRegistry;
/// use conduit_core::traits::Capability;
///
/// let mut registry = ProviderRegistry::new();
/// conduit_provider_local::register(&mut registry);
/// assert!(registry.contains(Capability::Storage, "local"));
/// ```
pub fn register(registry: &mut ProviderRegistry) {
    registry.register(LOCAL_STORAGE, ProviderFactory::storage(LocalStorageFactory));
    registry.register(
        MEMORY_SEARCH,
        ProviderFactory::search(MemorySearchFactory::new()),
    );
}
