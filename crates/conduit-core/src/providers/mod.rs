//! Built-in providers
//!
//! Only the `dummy` family ships with the core. Real vendor integrations live
//! in plugin crates and register themselves the same way.

pub mod dummy;

pub use dummy::{
    DUMMY_PROVIDER, DummyEmailProvider, DummyFactory, DummyPhysicalMailProvider,
    DummySearchProvider, DummySigningProvider, DummyStorageProvider,
};

use crate::registry::{ProviderFactory, ProviderRegistry};

/// Register the built-in providers for every capability
pub fn register_builtin(registry: &mut ProviderRegistry) {
    let factory = DummyFactory::new();
    registry.register(DUMMY_PROVIDER, ProviderFactory::email(factory.clone()));
    registry.register(DUMMY_PROVIDER, ProviderFactory::storage(factory.clone()));
    registry.register(DUMMY_PROVIDER, ProviderFactory::signing(factory.clone()));
    registry.register(DUMMY_PROVIDER, ProviderFactory::search(factory.clone()));
    registry.register(DUMMY_PROVIDER, ProviderFactory::physical_mail(factory));
}
