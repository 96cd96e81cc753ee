//! Contract Test: Provider Registry
//!
//! Constraints verified:
//! - Registering a name twice keeps the second factory (last write wins)
//! - Names are case-insensitive
//! - Resolving an unknown name is a miss, never a panic or error
//! - The gateway turns a miss into a configuration error result

mod common;

use common::*;
use conduit_core::gateway::EmailRequest;
use conduit_core::registry::{ProviderFactory, ProviderRegistry};
use conduit_core::traits::Capability;
use serde_json::json;

#[tokio::test]
async fn last_registration_wins() {
    let first = ScriptedEmailFactory::new("first", Script::Succeed);
    let second = ScriptedEmailFactory::new("second", Script::Succeed);

    let mut registry = ProviderRegistry::new();
    registry.register("mail", ProviderFactory::email(first.clone()));
    registry.register("MAIL", ProviderFactory::email(second.clone()));
    assert_eq!(registry.list_names(Capability::Email).len(), 1);

    let (gateway, _) = instant_gateway(registry, json!({"providers": {"email": {"provider": "Mail"}}}));
    let result = gateway
        .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello"))
        .await;

    assert!(result.is_success());
    assert_eq!(first.counters().creates(), 0);
    assert_eq!(second.counters().creates(), 1);
}

#[test]
fn unknown_name_is_a_miss() {
    let registry = registry_with(&[]);
    assert!(registry.resolve(Capability::Email, "nope").is_none());
    assert!(!registry.contains(Capability::Email, "nope"));
    assert!(registry.resolve(Capability::Email, "dummy").is_some());
}

#[test]
fn discovery_lists_every_capability() {
    let registry = registry_with(&[("extra", ScriptedEmailFactory::new("extra", Script::Succeed))]);
    let all = registry.list_all();

    assert_eq!(all.len(), Capability::ALL.len());
    assert!(all[&Capability::Email].contains("extra"));
    assert!(all[&Capability::PhysicalMail].contains("dummy"));
}

#[tokio::test]
async fn unregistered_provider_is_a_configuration_error_result() {
    let (gateway, _) = instant_gateway(
        registry_with(&[]),
        json!({"providers": {"email": {"provider": "mailjet"}}}),
    );

    let result = gateway
        .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello"))
        .await;

    assert_eq!(result.status(), "error");
    let message = result.error_message().unwrap();
    assert!(message.contains("Configuration error"), "{}", message);
    assert!(message.contains("mailjet"), "{}", message);
}

#[tokio::test]
async fn providers_are_built_lazily() {
    let factory = ScriptedEmailFactory::new("lazy", Script::Succeed);
    let (gateway, _) = instant_gateway(
        registry_with(&[("lazy", factory.clone())]),
        json!({"providers": {"email": {"provider": "lazy"}}}),
    );

    assert_eq!(factory.counters().creates(), 0);

    // Another capability does not touch the email factory
    let _ = gateway
        .list_files(&conduit_core::gateway::ListRequest {
            bucket: "b".into(),
            provider: Some("dummy".into()),
            ..Default::default()
        })
        .await;
    assert_eq!(factory.counters().creates(), 0);

    gateway
        .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello"))
        .await;
    assert_eq!(factory.counters().creates(), 1);
}
