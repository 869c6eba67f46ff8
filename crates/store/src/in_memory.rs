//! In-memory backend — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use slotboard_core::error::KvError;
use slotboard_core::kv::{KvBackend, KvOp};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// An in-memory backend that stores values in a HashMap.
/// Transactions apply under one write lock, so they are atomic.
/// Clones share the same map.
#[derive(Clone)]
pub struct InMemoryKv {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// All keys, sorted. Handy for asserting on storage layout in tests.
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Default for InMemoryKv {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvBackend for InMemoryKv {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), KvError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), KvError> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn bulk_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        let entries = self.entries.read().await;
        Ok(keys
            .iter()
            .map(|k| (k.clone(), entries.get(k).cloned()))
            .collect())
    }

    async fn execute_transaction(&self, ops: Vec<KvOp>) -> Result<(), KvError> {
        let mut entries = self.entries.write().await;
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
        Ok(())
    }
}
