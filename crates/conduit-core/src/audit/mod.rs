// # Audit Logging
//
// Every provider call the gateway makes ends in exactly one audit record,
// written through an [`AuditSink`]. Records are append-only.
//
// ## Record Format
//
// One JSON object per line:
//
// ```json
// {"timestamp":"2025-01-09T12:00:00.000Z","provider":"sendgrid","method":"send_email",
//  "request":{"to":"user@test.com","api_key":"************abcd"},
//  "response":{"message_id":"m-1"},"error":null,"duration_ms":12.5,"status":"success"}
// ```
//
// ## Masking
//
// Request fields whose key contains `password`, `api_key`, `secret`, `token`
// or `key` (any case) are masked before the record leaves the logger. Strings
// longer than four characters keep their last four; everything else becomes
// `***`. Nested mappings are masked the same way.
//
// ## Write Failures
//
// [`AuditLogger::log_call`] never fails. A sink error is reported with
// `tracing::warn!` and the business result is returned unchanged.

pub mod file;
pub mod memory;

pub use file::FileAuditSink;
pub use memory::MemoryAuditSink;

use crate::config::AuditConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Key fragments that mark a request field as sensitive
pub const SENSITIVE_TERMS: [&str; 5] = ["password", "api_key", "secret", "token", "key"];

/// Replacement for short or non-string sensitive values
pub const SHORT_MASK: &str = "***";

/// Outcome label stored in each record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    /// The call returned a result
    Success,
    /// The call failed
    Error,
}

/// One audited provider call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// When the call finished (UTC)
    pub timestamp: DateTime<Utc>,

    /// Provider name
    pub provider: String,

    /// Gateway operation name (e.g. "send_email")
    pub method: String,

    /// Masked request fields
    pub request: Map<String, Value>,

    /// Response payload for successful calls
    #[serde(default)]
    pub response: Option<Value>,

    /// Error message for failed calls
    #[serde(default)]
    pub error: Option<String>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: f64,

    /// `success` when `error` is absent
    pub status: CallStatus,
}

impl AuditRecord {
    /// Build a record, masking the request
    pub fn new(
        provider: impl Into<String>,
        method: impl Into<String>,
        request: &Map<String, Value>,
        response: Option<Value>,
        error: Option<String>,
        duration: Duration,
    ) -> Self {
        let status = if error.is_none() {
            CallStatus::Success
        } else {
            CallStatus::Error
        };

        Self {
            timestamp: Utc::now(),
            provider: provider.into(),
            method: method.into(),
            request: mask_sensitive(request),
            response: if error.is_none() { response } else { None },
            error,
            duration_ms: duration.as_nanos() as f64 / 1_000_000.0,
            status,
        }
    }

    /// Whether the call succeeded
    pub fn is_success(&self) -> bool {
        self.status == CallStatus::Success
    }
}

/// Durable destination for audit records
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Append one record
    async fn append(&self, record: &AuditRecord) -> Result<()>;

    /// Read back every readable record in write order
    ///
    /// Corrupt entries are skipped.
    async fn read_all(&self) -> Result<Vec<AuditRecord>>;
}

/// Sink that discards everything, used when auditing is disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn append(&self, _record: &AuditRecord) -> Result<()> {
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>> {
        Ok(Vec::new())
    }
}

/// Query filter for [`AuditLogger::get_calls`]
///
/// Unset fields match everything. Set fields are AND-combined.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallFilter {
    /// Exact provider name
    pub provider: Option<String>,
    /// Exact method name
    pub method: Option<String>,
    /// Earliest timestamp, inclusive
    pub start: Option<DateTime<Utc>>,
    /// Latest timestamp, inclusive
    pub end: Option<DateTime<Utc>>,
}

impl CallFilter {
    /// Match a single provider
    pub fn provider(provider: impl Into<String>) -> Self {
        Self {
            provider: Some(provider.into()),
            ..Self::default()
        }
    }

    /// Restrict to one method
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Restrict to a time window
    pub fn between(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    fn matches(&self, record: &AuditRecord) -> bool {
        self.provider.as_ref().is_none_or(|p| *p == record.provider)
            && self.method.as_ref().is_none_or(|m| *m == record.method)
            && self.start.is_none_or(|start| record.timestamp >= start)
            && self.end.is_none_or(|end| record.timestamp <= end)
    }
}

/// Aggregates over a set of audit records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of records
    pub total: usize,
    /// Records with `status == success`
    pub success_count: usize,
    /// Records with `status == error`
    pub error_count: usize,
    /// `success_count / total`, 0 when empty
    pub success_rate: f64,
    /// Mean `duration_ms`, 0 when empty
    pub avg_duration_ms: f64,
    /// Distinct providers seen
    pub providers: BTreeSet<String>,
}

impl Statistics {
    /// Compute statistics over `records`
    pub fn from_records(records: &[AuditRecord]) -> Self {
        if records.is_empty() {
            return Self::default();
        }

        let total = records.len();
        let success_count = records.iter().filter(|r| r.is_success()).count();
        let duration_sum: f64 = records.iter().map(|r| r.duration_ms).sum();

        Self {
            total,
            success_count,
            error_count: total - success_count,
            success_rate: success_count as f64 / total as f64,
            avg_duration_ms: duration_sum / total as f64,
            providers: records.iter().map(|r| r.provider.clone()).collect(),
        }
    }
}

/// Audit logger
///
/// Cheap to clone; clones share the same sink.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    sink: Arc<dyn AuditSink>,
}

impl AuditLogger {
    /// Create a logger writing to `sink`
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Create a logger that drops every record
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullAuditSink))
    }

    /// Build the logger described by configuration
    ///
    /// Creates the log file's parent directory when auditing is enabled.
    pub async fn from_config(config: &AuditConfig) -> Result<Self> {
        if !config.enabled {
            info!("Audit logging disabled");
            return Ok(Self::disabled());
        }

        let sink = FileAuditSink::new(&config.log_file).await?;
        info!("Audit log: {}", config.log_file.display());
        Ok(Self::new(Arc::new(sink)))
    }

    /// Record a call, reporting sink failures through tracing only
    pub async fn log_call(
        &self,
        provider: &str,
        method: &str,
        request: &Map<String, Value>,
        response: Option<Value>,
        error: Option<&str>,
        duration: Duration,
    ) {
        if let Err(e) = self
            .try_log_call(provider, method, request, response, error, duration)
            .await
        {
            warn!("Failed to write audit record for {}.{}: {}", provider, method, e);
        }
    }

    /// Record a call, returning sink failures as [`Error::AuditWrite`]
    pub async fn try_log_call(
        &self,
        provider: &str,
        method: &str,
        request: &Map<String, Value>,
        response: Option<Value>,
        error: Option<&str>,
        duration: Duration,
    ) -> Result<()> {
        let record = AuditRecord::new(
            provider,
            method,
            request,
            response,
            error.map(str::to_string),
            duration,
        );

        match &record.error {
            Some(message) => error!("API call failed: {}.{} - {}", provider, method, message),
            None => info!(
                "API call: {}.{} - {:.2}ms",
                provider, method, record.duration_ms
            ),
        }

        self.sink.append(&record).await.map_err(|e| match e {
            Error::AuditWrite(_) => e,
            other => Error::audit_write(other.to_string()),
        })
    }

    /// Records matching `filter`, in write order
    pub async fn get_calls(&self, filter: &CallFilter) -> Result<Vec<AuditRecord>> {
        let records = self.sink.read_all().await?;
        Ok(records.into_iter().filter(|r| filter.matches(r)).collect())
    }

    /// Statistics over all records, optionally for one provider
    pub async fn get_statistics(&self, provider: Option<&str>) -> Result<Statistics> {
        let filter = CallFilter {
            provider: provider.map(str::to_string),
            ..CallFilter::default()
        };
        let records = self.get_calls(&filter).await?;
        Ok(Statistics::from_records(&records))
    }
}

/// Mask sensitive fields of a request mapping
pub fn mask_sensitive(request: &Map<String, Value>) -> Map<String, Value> {
    request
        .iter()
        .map(|(key, value)| {
            let masked = if is_sensitive(key) {
                mask_value(value)
            } else {
                mask_nested(value)
            };
            (key.clone(), masked)
        })
        .collect()
}

/// Mask every mapping reachable from `value`, through arrays included
fn mask_nested(value: &Value) -> Value {
    match value {
        Value::Object(nested) => Value::Object(mask_sensitive(nested)),
        Value::Array(items) => Value::Array(items.iter().map(mask_nested).collect()),
        other => other.clone(),
    }
}

fn is_sensitive(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_TERMS.iter().any(|term| key.contains(term))
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) if s.chars().count() > 4 => {
            let chars: Vec<char> = s.chars().collect();
            let visible: String = chars[chars.len() - 4..].iter().collect();
            Value::String(format!("{}{}", "*".repeat(chars.len() - 4), visible))
        }
        _ => Value::String(SHORT_MASK.to_string()),
    }
}
