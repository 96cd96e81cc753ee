// # conduit-core
//
// Core library for the conduit provider gateway.
//
// ## Architecture Overview
//
// Callers ask for a logical capability ("send an email") and the gateway
// decides which concrete vendor handles it:
// - **Capability traits**: one contract per service family (email, storage,
//   signing, search, physical mail)
// - **ProviderRegistry**: plugin-based map from provider name to factory
// - **SecretsResolver**: environment first, then a local JSON secret store
// - **RetryPolicy**: exponential backoff with additive jitter
// - **FallbackController**: ordered failover across providers
// - **AuditLogger**: append-only, masked record of every provider call
// - **Gateway**: the facade tying it together and returning structured results
//
// ## Design Principles
//
// 1. **Plugin-Based**: Providers are registered at startup, no hard-coded if-else
// 2. **Lazy**: Providers are built when a capability is invoked, never before
// 3. **Errors as values**: The gateway never lets a provider failure escape;
//    every operation returns a result with a `status`
// 4. **Library-First**: The binary is a thin wrapper around this crate

pub mod audit;
pub mod config;
pub mod env;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod secrets;
pub mod traits;

// Re-export core types for convenience
pub use audit::{AuditLogger, AuditRecord, AuditSink, CallFilter, Statistics};
pub use config::{ConfigLoader, GatewayConfig, ProviderConfig};
pub use error::{Error, Result};
pub use fallback::FallbackController;
pub use gateway::{Gateway, OperationResult};
pub use registry::{ProviderFactory, ProviderRegistry};
pub use retry::RetryPolicy;
pub use secrets::SecretsResolver;
pub use traits::{
    Capability, EmailProvider, PhysicalMailProvider, SearchProvider, SigningProvider,
    StorageProvider,
};
