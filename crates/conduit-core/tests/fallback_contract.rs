//! Contract Test: Fallback Controller
//!
//! Constraints verified:
//! - Providers are tried in order and the first success is returned
//! - `current_provider_index` records which provider served the call
//! - When every provider fails, the last provider's error is propagated
//! - Retry composes per provider: each provider is retried before failover

mod common;

use common::*;
use conduit_core::error::{Error, Result};
use conduit_core::fallback::FallbackController;
use conduit_core::gateway::EmailRequest;
use conduit_core::traits::Capability;
use serde_json::json;
use std::sync::Mutex;

fn chain(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

#[tokio::test]
async fn failing_then_succeeding_provider() {
    let controller = FallbackController::new();

    let served = controller
        .execute(&chain(&["a", "b"]), |name| async move {
            match name.as_str() {
                "a" => Err(Error::transient("a", "down")),
                _ => Ok("b-result"),
            }
        })
        .await
        .unwrap();

    assert_eq!(served.value, "b-result");
    assert_eq!(served.provider, "b");
    assert_eq!(controller.current_provider_index(), 1);
}

#[tokio::test]
async fn all_failing_propagates_last_error() {
    let controller = FallbackController::new();
    let tried = &Mutex::new(Vec::new());

    let result: Result<_> = controller
        .execute(&chain(&["a", "b", "c"]), |name| async move {
            tried.lock().unwrap().push(name.clone());
            Err::<(), _>(Error::transient(name, "down"))
        })
        .await;

    match result {
        Err(Error::TransientProvider { provider, .. }) => assert_eq!(provider, "c"),
        other => panic!("expected last provider's error, got {:?}", other),
    }
    assert_eq!(*tried.lock().unwrap(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn gateway_retries_each_provider_before_failing_over() {
    let primary = ScriptedEmailFactory::new("primary", Script::AlwaysTransient);
    let backup = ScriptedEmailFactory::new("backup", Script::Succeed);
    let registry = registry_with(&[("primary", primary.clone()), ("backup", backup.clone())]);

    let (gateway, sink) = instant_gateway(
        registry,
        json!({
            "providers": {"email": {"provider": "primary", "fallback": ["backup"]}},
            "retry": {"max_retries": 2}
        }),
    );

    let result = gateway
        .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello"))
        .await;

    assert!(result.is_success());
    assert_eq!(result.provider(), Some("backup"));
    assert_eq!(primary.counters().sends(), 3);
    assert_eq!(backup.counters().sends(), 1);
    assert_eq!(gateway.current_provider_index(Capability::Email), 1);

    // One audit record per provider tried
    let records = sink.records().await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].provider, "primary");
    assert!(!records[0].is_success());
    assert_eq!(records[1].provider, "backup");
    assert!(records[1].is_success());
}

#[tokio::test]
async fn permanent_error_skips_retry_but_still_fails_over() {
    let primary = ScriptedEmailFactory::new("primary", Script::AlwaysPermanent);
    let backup = ScriptedEmailFactory::new("backup", Script::Succeed);
    let registry = registry_with(&[("primary", primary.clone()), ("backup", backup.clone())]);

    let (gateway, _) = instant_gateway(
        registry,
        json!({"providers": {"email": {"provider": "primary", "fallback": "backup"}}}),
    );

    let result = gateway
        .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello"))
        .await;

    assert!(result.is_success());
    assert_eq!(primary.counters().sends(), 1);
}

#[tokio::test]
async fn explicit_override_disables_fallback() {
    let primary = ScriptedEmailFactory::new("primary", Script::AlwaysTransient);
    let backup = ScriptedEmailFactory::new("backup", Script::Succeed);
    let registry = registry_with(&[("primary", primary.clone()), ("backup", backup.clone())]);

    let (gateway, _) = instant_gateway(
        registry,
        json!({
            "providers": {"email": {"provider": "backup", "fallback": ["backup"]}},
            "retry": {"max_retries": 0}
        }),
    );

    let result = gateway
        .send_email(&EmailRequest::new("user@test.com", "Hi", "Hello").with_provider("primary"))
        .await;

    assert!(!result.is_success());
    assert_eq!(result.provider(), Some("primary"));
    assert_eq!(backup.counters().sends(), 0);
}
