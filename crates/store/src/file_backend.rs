//! File-based backend — persistent JSON storage.
//!
//! The file is one JSON object per logical store (`store -> key -> value`),
//! kept in memory and rewritten on every mutation. Simple, portable,
//! human-inspectable, and needs no database. Each process should hold one
//! `FileKv` per file.
//!
//! Default location: `~/.slotboard/state.json`

use async_trait::async_trait;
use slotboard_core::error::KvError;
use slotboard_core::kv::{KvBackend, KvOp};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

type Entries = BTreeMap<String, String>;
type Document = BTreeMap<String, Entries>;

/// A file-backed key-value store bound to one logical store.
///
/// Entries are loaded on creation and flushed to disk on every mutation.
/// Other stores in the same file are carried along untouched.
pub struct FileKv {
    path: PathBuf,
    store: String,
    document: Arc<RwLock<Document>>,
}

impl FileKv {
    /// Open the backend at `path` for `store`.
    ///
    /// If the file exists, entries are loaded from it.
    /// If the file does not exist, starts empty (file created on first write).
    pub fn new(path: PathBuf, store: &str) -> Self {
        let document = Self::load_from_disk(&path);
        debug!(
            path = %path.display(),
            store,
            count = document.get(store).map_or(0, BTreeMap::len),
            "File key-value backend loaded"
        );
        Self {
            path,
            store: store.to_string(),
            document: Arc::new(RwLock::new(document)),
        }
    }

    fn load_from_disk(path: &Path) -> Document {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return Document::new(), // File doesn't exist yet — start empty
        };

        match serde_json::from_str(&content) {
            Ok(document) => document,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Corrupted state file, starting empty");
                Document::new()
            }
        }
    }

    /// Write the whole document to disk.
    async fn flush(&self, document: &Document) -> Result<(), KvError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                KvError::Unavailable(format!("Failed to create state directory: {e}"))
            })?;
        }

        let content = serde_json::to_string_pretty(document)
            .map_err(|e| KvError::Storage(format!("Failed to serialize state: {e}")))?;

        // Write-then-rename so a crash never leaves a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| KvError::Unavailable(format!("Failed to write state file: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| KvError::Unavailable(format!("Failed to replace state file: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl KvBackend for FileKv {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let document = self.document.read().await;
        Ok(document.get(&self.store).and_then(|e| e.get(key)).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        let mut document = self.document.write().await;
        document
            .entry(self.store.clone())
            .or_default()
            .insert(key.to_string(), value);
        self.flush(&document).await
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        let mut document = self.document.write().await;
        let removed = document
            .get_mut(&self.store)
            .is_some_and(|e| e.remove(key).is_some());
        if removed {
            self.flush(&document).await?;
        }
        Ok(())
    }

    async fn bulk_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        let document = self.document.read().await;
        let entries = document.get(&self.store);
        Ok(keys
            .iter()
            .map(|k| (k.clone(), entries.and_then(|e| e.get(k)).cloned()))
            .collect())
    }

    async fn execute_transaction(&self, ops: Vec<KvOp>) -> Result<(), KvError> {
        let mut document = self.document.write().await;
        let mut staged = document.clone();
        let entries = staged.entry(self.store.clone()).or_default();
        for op in ops {
            match op {
                KvOp::Upsert { key, value } => {
                    entries.insert(key, value);
                }
                KvOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        // Only adopt the new document once it is on disk
        self.flush(&staged).await?;
        *document = staged;
        Ok(())
    }
}
