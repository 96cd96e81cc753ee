// # Memory Audit Sink
//
// Keeps records in a Vec. Nothing survives a restart; useful for tests and
// for embedding the gateway where a separate log pipeline is not wanted.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{AuditRecord, AuditSink};
use crate::Error;

/// In-memory audit sink
///
/// Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    inner: Arc<RwLock<Vec<AuditRecord>>>,
}

impl MemoryAuditSink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far
    pub async fn records(&self) -> Vec<AuditRecord> {
        self.inner.read().await.clone()
    }

    /// Get the number of records
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the sink is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        self.inner.write().await.push(record.clone());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, Error> {
        Ok(self.records().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditLogger, CallFilter};
    use serde_json::Map;
    use std::time::Duration;

    #[tokio::test]
    async fn test_memory_sink_filters() {
        let sink = MemoryAuditSink::new();
        let logger = AuditLogger::new(Arc::new(sink.clone()));

        logger
            .log_call("a", "send_email", &Map::new(), None, None, Duration::from_millis(10))
            .await;
        logger
            .log_call("a", "upload_file", &Map::new(), None, Some("boom"), Duration::from_millis(30))
            .await;
        logger
            .log_call("b", "send_email", &Map::new(), None, None, Duration::from_millis(20))
            .await;

        assert_eq!(sink.len().await, 3);

        let calls = logger
            .get_calls(&CallFilter::provider("a").with_method("send_email"))
            .await
            .unwrap();
        assert_eq!(calls.len(), 1);

        let stats = logger.get_statistics(Some("a")).await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.success_count, 1);
        assert_eq!(stats.error_count, 1);
        assert_eq!(stats.success_rate, 0.5);
        assert!((stats.avg_duration_ms - 20.0).abs() < 1e-9);

        let all = logger.get_statistics(None).await.unwrap();
        assert_eq!(all.providers.len(), 2);
    }
}
