//! Output sinks.
//!
//! Records are appended, never rewritten. `JsonlSink` writes one JSON object
//! per line; `MemorySink` keeps them in memory for embedders and tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error_handling::StorageError;
use crate::models::OutputRecord;

/// Append-only destination for crawl output.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Appends one record. An error leaves the record unwritten and makes the
    /// crawl retry the request that produced it.
    async fn append(&self, record: OutputRecord) -> Result<(), StorageError>;

    /// Appends several records in order, stopping at the first failure.
    async fn append_all(&self, records: Vec<OutputRecord>) -> Result<(), StorageError> {
        for record in records {
            self.append(record).await?;
        }
        Ok(())
    }
}

/// JSON Lines file sink. Appends to an existing file.
pub struct JsonlSink {
    path: PathBuf,
    file: tokio::sync::Mutex<tokio::fs::File>,
}

impl JsonlSink {
    /// Opens `path` for appending, creating it and its parent directories.
    pub async fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        Ok(Self {
            path: path.to_path_buf(),
            file: tokio::sync::Mutex::new(file),
        })
    }

    /// File the records are appended to.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OutputSink for JsonlSink {
    async fn append(&self, record: OutputRecord) -> Result<(), StorageError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');
        // One write per line under the lock keeps concurrent records from interleaving.
        let mut file = self.file.lock().await;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// In-memory sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<OutputRecord>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far.
    pub fn records(&self) -> Vec<OutputRecord> {
        match self.records.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl OutputSink for MemorySink {
    async fn append(&self, record: OutputRecord) -> Result<(), StorageError> {
        match self.records.lock() {
            Ok(mut guard) => guard.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }
        Ok(())
    }
}
