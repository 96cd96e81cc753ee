//! Minimal embedding example for conduit-core
//!
//! Registers an application-defined email provider next to the built-in
//! ones, configures it as primary with `dummy` as fallback, and shows retry,
//! failover and the audit trail from inside a host application.

use async_trait::async_trait;
use conduit_core::audit::MemoryAuditSink;
use conduit_core::config::ProviderConfig;
use conduit_core::gateway::{EmailRequest, IndexRequest, SearchRequest, UploadRequest};
use conduit_core::traits::{EmailMessage, EmailProvider, EmailProviderFactory, EmailReceipt, StatusInfo};
use conduit_core::{
    AuditLogger, Error, Gateway, GatewayConfig, ProviderFactory, ProviderRegistry, Result,
    RetryPolicy, SecretsResolver,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Email provider that is down for its first `outage` sends
struct ConsoleEmail {
    sends: Arc<AtomicUsize>,
    outage: usize,
}

#[async_trait]
impl EmailProvider for ConsoleEmail {
    async fn send(&self, message: &EmailMessage) -> Result<EmailReceipt> {
        let n = self.sends.fetch_add(1, Ordering::SeqCst);
        if n < self.outage {
            println!("[console] send #{} failed (simulated outage)", n + 1);
            return Err(Error::transient("console", "upstream unavailable"));
        }

        println!("[console] To: {} | {}", message.to, message.subject);
        Ok(EmailReceipt {
            message_id: format!("console-{}", n),
            status: "sent".to_string(),
        })
    }

    async fn get_status(&self, _message_id: &str) -> Result<StatusInfo> {
        Ok(StatusInfo::new("sent"))
    }

    fn provider_name(&self) -> &str {
        "console"
    }
}

struct ConsoleEmailFactory {
    sends: Arc<AtomicUsize>,
}

#[async_trait]
impl EmailProviderFactory for ConsoleEmailFactory {
    async fn create(&self, config: &ProviderConfig) -> Result<Box<dyn EmailProvider>> {
        let outage = config
            .values
            .get("outage")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(0) as usize;
        Ok(Box::new(ConsoleEmail {
            sends: self.sends.clone(),
            outage,
        }))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    println!("=== Embedded conduit-core Example ===\n");

    let mut registry = ProviderRegistry::new();
    conduit_core::providers::register_builtin(&mut registry);
    conduit_provider_local::register(&mut registry);
    registry.register(
        "console",
        ProviderFactory::email(ConsoleEmailFactory {
            sends: Arc::new(AtomicUsize::new(0)),
        }),
    );

    let storage_root = std::env::temp_dir().join("conduit-demo");
    let config = GatewayConfig::from_value(serde_json::json!({
        "providers": {
            "email": {
                "provider": "console",
                "fallback": ["dummy"],
                "console": {"outage": 10}
            },
            "storage": {
                "provider": "local",
                "local": {"root": storage_root.to_string_lossy()}
            },
            "search": {"provider": "memory"}
        }
    }))?;

    let sink = MemoryAuditSink::new();
    let gateway = Gateway::new(
        Arc::new(registry),
        config,
        SecretsResolver::new("secrets"),
        RetryPolicy::default()
            .with_max_retries(2)
            .with_delays(Duration::from_millis(20), Duration::from_millis(100)),
        AuditLogger::new(Arc::new(sink.clone())),
    );

    println!("1. Registered providers: {:?}\n", gateway.registry().list_all());

    println!("2. Sending email (console is down, dummy is the fallback)...");
    let result = gateway
        .send_email(&EmailRequest::new("ops@example.com", "Nightly report", "All green"))
        .await;
    println!("   {}\n", serde_json::to_string(&result)?);

    println!("3. Uploading this example to local storage...");
    let upload = UploadRequest {
        file: std::path::PathBuf::from(file!()),
        bucket: "demo".to_string(),
        ..UploadRequest::default()
    };
    println!("   {}\n", serde_json::to_string(&gateway.upload_file(&upload).await)?);

    println!("4. Indexing and searching...");
    let index = IndexRequest {
        id: "runbook-1".to_string(),
        index: "docs".to_string(),
        document: serde_json::json!({"title": "Restarting the mail relay"}),
        ..IndexRequest::default()
    };
    gateway.index_document(&index).await;
    let hits = gateway
        .search(&SearchRequest::new("mail relay", "docs"))
        .await;
    println!("   {}\n", serde_json::to_string(&hits)?);

    println!("5. Audit trail:");
    for record in sink.records().await {
        println!(
            "   {:<8} {:<16} {:<8} {:.2}ms",
            record.provider, record.method, format!("{:?}", record.status), record.duration_ms
        );
    }

    let stats = gateway.audit().get_statistics(None).await?;
    println!("\n=== {} calls, {:.0}% success ===", stats.total, stats.success_rate * 100.0);

    Ok(())
}
