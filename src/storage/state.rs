//! Crawl-state dedup store.
//!
//! Remembers the stable identity of every listing already emitted so a
//! restarted or migrated run does not emit it again. The set lives in memory
//! behind one mutex; `try_claim` is the single check-and-insert point.
//! Claims made through [`PendingClaims`] only stick once the records they
//! cover were written.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error_handling::StorageError;

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CrawlStateFile {
    #[serde(default)]
    crawled_keys: BTreeSet<String>,
}

#[derive(Debug)]
pub struct CrawlStateStore {
    path: PathBuf,
    keys: Mutex<HashSet<String>>,
}

impl CrawlStateStore {
    /// Loads the state file at `path`. A missing file starts an empty store;
    /// an unreadable one is logged and ignored.
    pub fn load(path: &Path) -> Self {
        let keys = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<CrawlStateFile>(&content) {
                Ok(file) => {
                    debug!(
                        "Loaded {} crawled keys from {}",
                        file.crawled_keys.len(),
                        path.display()
                    );
                    file.crawled_keys.into_iter().collect()
                }
                Err(e) => {
                    warn!(
                        "Ignoring unreadable crawl state {}: {}",
                        path.display(),
                        e
                    );
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashSet::new(),
            Err(e) => {
                warn!("Failed to read crawl state {}: {}", path.display(), e);
                HashSet::new()
            }
        };
        Self {
            path: path.to_path_buf(),
            keys: Mutex::new(keys),
        }
    }

    /// Records `key` as emitted. Returns false when it already was.
    pub fn try_claim(&self, key: &str) -> bool {
        let mut keys = match self.keys.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        keys.insert(key.to_string())
    }

    /// Forgets `key`, so a later claim for it succeeds again.
    pub fn release(&self, key: &str) {
        let mut keys = match self.keys.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        keys.remove(key);
    }

    /// Starts a batch of claims that is rolled back unless committed.
    pub fn begin_claims(&self) -> PendingClaims<'_> {
        PendingClaims {
            store: self,
            keys: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn contains(&self, key: &str) -> bool {
        match self.keys.lock() {
            Ok(guard) => guard.contains(key),
            Err(poisoned) => poisoned.into_inner().contains(key),
        }
    }

    pub fn len(&self) -> usize {
        match self.keys.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the current key set to disk through a temp file and a rename,
    /// so a reader never sees a half-written state.
    pub async fn persist(&self) -> Result<(), StorageError> {
        let snapshot = {
            let keys = match self.keys.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            CrawlStateFile {
                crawled_keys: keys.iter().cloned().collect(),
            }
        };
        let json = serde_json::to_vec_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(
            "Persisted {} crawled keys to {}",
            snapshot.crawled_keys.len(),
            self.path.display()
        );
        Ok(())
    }
}

/// Keys claimed for records that are not written yet.
///
/// Dropping the batch without [`commit`](Self::commit) releases every claim,
/// including when the owning future is cancelled mid-write.
pub struct PendingClaims<'a> {
    store: &'a CrawlStateStore,
    keys: Vec<String>,
}

impl PendingClaims<'_> {
    pub fn try_claim(&mut self, key: &str) -> bool {
        if !self.store.try_claim(key) {
            return false;
        }
        self.keys.push(key.to_string());
        true
    }

    pub fn commit(mut self) {
        self.keys.clear();
    }
}

impl Drop for PendingClaims<'_> {
    fn drop(&mut self) {
        if !self.keys.is_empty() {
            debug!("Releasing {} unwritten claim(s)", self.keys.len());
        }
        for key in self.keys.drain(..) {
            self.store.release(&key);
        }
    }
}
