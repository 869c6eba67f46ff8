//! Key-value backend trait — the only persistence primitive the engine uses.
//!
//! The backend offers per-key get/set/delete, a bulk read, and an optional
//! best-effort atomic multi-key apply. It has no ordered collections and no
//! general multi-key transactions; the slot engine is built around that.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{KvError, Result};

/// A single write in a multi-key transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    Upsert { key: String, value: String },
    Delete { key: String },
}

/// The core KvBackend trait.
///
/// Implementations: in-memory (for testing), JSON file, SQLite.
/// Values are UTF-8 JSON documents.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// The backend name (e.g., "memory", "file", "sqlite").
    fn name(&self) -> &str;

    /// Read a single key.
    async fn get(&self, key: &str) -> std::result::Result<Option<String>, KvError>;

    /// Write a single key, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> std::result::Result<(), KvError>;

    /// Delete a single key. Deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> std::result::Result<(), KvError>;

    /// Read many keys. Returns one entry per requested key, in request order.
    ///
    /// The default issues all reads concurrently and fans them back in
    /// order; backends with a native multi-get should override it.
    async fn bulk_get(
        &self,
        keys: &[String],
    ) -> std::result::Result<Vec<(String, Option<String>)>, KvError> {
        let reads = keys.iter().map(|key| async move {
            self.get(key).await.map(|value| (key.clone(), value))
        });
        futures::future::try_join_all(reads).await
    }

    /// Apply several writes atomically, if the backend can.
    async fn execute_transaction(&self, ops: Vec<KvOp>) -> std::result::Result<(), KvError> {
        let _ = ops;
        Err(KvError::Unsupported(format!(
            "{} has no multi-key transactions",
            self.name()
        )))
    }
}

/// Read and decode a JSON value.
pub async fn get_json<T: DeserializeOwned>(kv: &dyn KvBackend, key: &str) -> Result<Option<T>> {
    match kv.get(key).await? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encode and write a JSON value.
pub async fn set_json<T: Serialize + ?Sized>(kv: &dyn KvBackend, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    kv.set(key, raw).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::RwLock;

    /// Minimal backend that relies on the trait's default methods.
    #[derive(Default)]
    struct MapKv {
        entries: RwLock<HashMap<String, String>>,
    }

    #[async_trait]
    impl KvBackend for MapKv {
        fn name(&self) -> &str {
            "map"
        }

        async fn get(&self, key: &str) -> std::result::Result<Option<String>, KvError> {
            Ok(self.entries.read().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: String) -> std::result::Result<(), KvError> {
            self.entries.write().await.insert(key.to_string(), value);
            Ok(())
        }

        async fn delete(&self, key: &str) -> std::result::Result<(), KvError> {
            self.entries.write().await.remove(key);
            Ok(())
        }
    }

    #[tokio::test]
    async fn default_bulk_get_preserves_request_order() {
        let kv = MapKv::default();
        kv.set("b", "2".into()).await.unwrap();
        kv.set("a", "1".into()).await.unwrap();

        let keys = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
        let got = kv.bulk_get(&keys).await.unwrap();
        assert_eq!(
            got,
            vec![
                ("a".to_string(), Some("1".to_string())),
                ("missing".to_string(), None),
                ("b".to_string(), Some("2".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn default_transaction_is_unsupported() {
        let kv = MapKv::default();
        let err = kv
            .execute_transaction(vec![KvOp::Delete { key: "a".into() }])
            .await
            .unwrap_err();
        assert!(matches!(err, KvError::Unsupported(_)));
    }

    #[tokio::test]
    async fn json_helpers_roundtrip_through_backend() {
        let kv = MapKv::default();
        set_json(&kv, "list", &vec!["x", "y"]).await.unwrap();
        let back: Option<Vec<String>> = get_json(&kv, "list").await.unwrap();
        assert_eq!(back, Some(vec!["x".to_string(), "y".to_string()]));

        let none: Option<Vec<String>> = get_json(&kv, "nope").await.unwrap();
        assert!(none.is_none());
    }
}
