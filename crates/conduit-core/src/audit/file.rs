// # File Audit Sink
//
// Append-only JSONL file, one record per line.
//
// ## Concurrency
//
// Appends from one process are serialized by a mutex so concurrent calls
// never interleave partial lines. Each record is written with a single
// `write_all` of the full line.
//
// ## Corruption Handling
//
// Reading tolerates damage: blank lines and lines that don't parse as a
// record are skipped with a warning instead of failing the whole read.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{AuditRecord, AuditSink};
use crate::Error;

/// JSONL file sink
///
/// # Example
///
/// ```rust,no_run
/// use conduit_core::audit::{AuditLogger, FileAuditSink};
/// use std::sync::Arc;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let sink = FileAuditSink::new("logs/api_call_logs.jsonl").await?;
///     let logger = AuditLogger::new(Arc::new(sink));
///
///     let stats = logger.get_statistics(Some("sendgrid")).await?;
///     println!("{} calls", stats.total);
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileAuditSink {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileAuditSink {
    /// Open a sink at `path`, creating parent directories if needed
    ///
    /// The file itself is created on first append.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create audit log directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AuditSink for FileAuditSink {
    async fn append(&self, record: &AuditRecord) -> Result<(), Error> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| Error::audit_write(format!("Failed to serialize record: {}", e)))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                Error::audit_write(format!(
                    "Failed to open audit log {}: {}",
                    self.path.display(),
                    e
                ))
            })?;

        file.write_all(line.as_bytes()).await.map_err(|e| {
            Error::audit_write(format!(
                "Failed to append to audit log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::audit_write(format!(
                "Failed to flush audit log {}: {}",
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Audit record appended to {}", self.path.display());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<AuditRecord>, Error> {
        if !self.path.exists() {
            tracing::debug!("Audit log does not exist yet: {}", self.path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).await?;

        let mut records = Vec::new();
        for (number, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(
                        "Skipping corrupt audit record at {}:{}: {}",
                        self.path.display(),
                        number + 1,
                        e
                    );
                }
            }
        }

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::CallStatus;
    use serde_json::Map;
    use std::time::Duration;
    use tempfile::tempdir;

    fn record(provider: &str) -> AuditRecord {
        AuditRecord::new(provider, "send_email", &Map::new(), None, None, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_file_sink_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("logs").join("calls.jsonl");

        let sink = FileAuditSink::new(&path).await.unwrap();
        assert!(path.parent().unwrap().exists());
        assert!(sink.read_all().await.unwrap().is_empty());

        sink.append(&record("a")).await.unwrap();
        sink.append(&record("b")).await.unwrap();

        let records = sink.read_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].provider, "a");
        assert_eq!(records[1].status, CallStatus::Success);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_file_sink_skips_corrupt_lines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("calls.jsonl");

        let sink = FileAuditSink::new(&path).await.unwrap();
        sink.append(&record("a")).await.unwrap();

        let mut content = std::fs::read_to_string(&path).unwrap();
        content.push_str("{not json\n\n{\"provider\": \"missing fields\"}\n");
        std::fs::write(&path, content).unwrap();

        sink.append(&record("b")).await.unwrap();

        let records = sink.read_all().await.unwrap();
        let providers: Vec<_> = records.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(providers, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_concurrent_appends_stay_line_aligned() {
        let dir = tempdir().unwrap();
        let sink = std::sync::Arc::new(
            FileAuditSink::new(dir.path().join("calls.jsonl")).await.unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..20 {
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                sink.append(&record(&format!("p{}", i))).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(sink.read_all().await.unwrap().len(), 20);
    }
}
