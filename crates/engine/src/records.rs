//! Content Record Store.
//!
//! Each record lives under a stable record key and is duplicated under the
//! slot key that currently holds it. Writes touching both go through
//! [`ContentStore::persist`], which uses the backend's multi-key apply when
//! it has one and falls back to two sequential writes otherwise.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use slotboard_core::kv::set_json;
use slotboard_core::{
    ContentRecord, Error, KvBackend, KvError, KvOp, Result, ScopeConfig, SlotContent,
};
use tracing::{debug, warn};

/// Content ids end up inside storage keys.
pub fn validate_content_id(content_id: &str) -> Result<()> {
    let well_formed = !content_id.is_empty()
        && content_id.len() <= 128
        && !content_id
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '{' || c == '}');
    if !well_formed {
        return Err(Error::Validation(format!("invalid content id '{content_id}'")));
    }
    Ok(())
}

/// Reads and writes content records for one scope.
#[derive(Clone)]
pub struct ContentStore {
    kv: Arc<dyn KvBackend>,
    config: ScopeConfig,
    transactions: Arc<AtomicBool>,
}

impl ContentStore {
    pub fn new(kv: Arc<dyn KvBackend>, config: ScopeConfig) -> Self {
        Self {
            kv,
            config,
            transactions: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Well-formed, and its record key does not alias a board key.
    pub fn check_id(&self, content_id: &str) -> Result<()> {
        validate_content_id(content_id)?;
        self.config.check_record_key(content_id)
    }

    /// Read a record. An undecodable value reads as missing so the slot
    /// copy can take its place.
    pub async fn get(&self, content_id: &str) -> Result<Option<ContentRecord>> {
        let key = self.config.layout.record_key(content_id);
        let raw = self.kv.get(&key).await?;
        Ok(raw.and_then(|raw| self.decode(&key, &raw)))
    }

    /// Fetch many records in one round trip. Missing or undecodable ids are
    /// absent from the map.
    pub async fn get_many(&self, ids: &[String]) -> Result<HashMap<String, ContentRecord>> {
        let keys: Vec<String> = ids.iter().map(|id| self.config.layout.record_key(id)).collect();
        let values = self.kv.bulk_get(&keys).await?;

        let mut found = HashMap::with_capacity(ids.len());
        for (id, (key, raw)) in ids.iter().zip(values) {
            if let Some(record) = raw.and_then(|raw| self.decode(&key, &raw)) {
                found.insert(id.clone(), record);
            }
        }
        Ok(found)
    }

    fn decode(&self, key: &str, raw: &str) -> Option<ContentRecord> {
        match serde_json::from_str(raw) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(scope = %self.config.name, %key, error = %e, "Unreadable content record treated as missing");
                None
            }
        }
    }

    /// Write the record key and, when placed in this scope, its slot key.
    pub async fn persist(&self, record: &ContentRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        let record_key = self.config.layout.record_key(&record.id);

        let Some(slot) = record.slot_in(&self.config.name) else {
            self.kv.set(&record_key, raw).await?;
            return Ok(());
        };
        let slot_key = self.config.layout.slot_key(slot);

        if self.transactions.load(Ordering::Relaxed) {
            let ops = vec![
                KvOp::Upsert {
                    key: record_key.clone(),
                    value: raw.clone(),
                },
                KvOp::Upsert {
                    key: slot_key.clone(),
                    value: raw.clone(),
                },
            ];
            match self.kv.execute_transaction(ops).await {
                Ok(()) => return Ok(()),
                Err(KvError::Unsupported(reason)) => {
                    debug!(backend = self.kv.name(), %reason, "Falling back to sequential dual writes");
                    self.transactions.store(false, Ordering::Relaxed);
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.kv.set(&record_key, raw.clone()).await?;
        self.kv.set(&slot_key, raw).await?;
        Ok(())
    }

    /// Write only the record key, leaving slot keys alone.
    pub async fn write_record_only(&self, record: &ContentRecord) -> Result<()> {
        set_json(self.kv.as_ref(), &self.config.layout.record_key(&record.id), record).await
    }

    /// Create a record or replace its payload, keeping its placement.
    ///
    /// The slot copy is refreshed only if the slot key really holds this
    /// content; a stale placement claim never overwrites another occupant.
    pub async fn upsert_payload(&self, content_id: &str, content: SlotContent) -> Result<ContentRecord> {
        self.check_id(content_id)?;
        let mut record = match self.get(content_id).await? {
            Some(mut existing) => {
                existing.content = content;
                existing.updated_at = chrono::Utc::now();
                existing
            }
            None => ContentRecord::new(content_id, content),
        };

        if let Some(slot) = record.slot_in(&self.config.name) {
            let key = self.config.layout.slot_key(slot);
            let occupant = self.kv.get(&key).await?.and_then(|raw| self.decode(&key, &raw));
            if occupant.is_none_or(|o| o.id != content_id) {
                warn!(
                    scope = %self.config.name,
                    content_id,
                    slot,
                    "Record claims a slot it does not occupy; clearing placement"
                );
                record.unlink();
            }
        }

        self.persist(&record).await?;
        Ok(record)
    }

    /// Delete the record key.
    pub async fn remove(&self, content_id: &str) -> Result<()> {
        self.kv.delete(&self.config.layout.record_key(content_id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotboard_core::ScopeConfig;
    use slotboard_store::InMemoryKv;

    fn store(kv: Arc<InMemoryKv>) -> ContentStore {
        ContentStore::new(kv, ScopeConfig::event_carousel())
    }

    #[test]
    fn content_ids_validated() {
        assert!(validate_content_id("evt-2025-01").is_ok());
        assert!(validate_content_id("").is_err());
        assert!(validate_content_id("has space").is_err());
        assert!(validate_content_id("{n}").is_err());
        assert!(validate_content_id(&"x".repeat(129)).is_err());
    }

    #[tokio::test]
    async fn persist_writes_record_and_slot_copy() {
        let kv = Arc::new(InMemoryKv::new());
        let records = store(kv.clone());

        let mut record = ContentRecord::new("E1", SlotContent::event("Fair"));
        record.link("event", 2);
        records.persist(&record).await.unwrap();

        assert_eq!(kv.keys().await, vec!["E1".to_string(), "event-slot-2".to_string()]);
        assert_eq!(kv.get("E1").await.unwrap(), kv.get("event-slot-2").await.unwrap());
    }

    #[tokio::test]
    async fn unplaced_record_writes_only_record_key() {
        let kv = Arc::new(InMemoryKv::new());
        let records = store(kv.clone());

        records
            .persist(&ContentRecord::new("E1", SlotContent::event("Fair")))
            .await
            .unwrap();
        assert_eq!(kv.keys().await, vec!["E1".to_string()]);
    }

    #[tokio::test]
    async fn upsert_keeps_placement_and_refreshes_slot_copy() {
        let kv = Arc::new(InMemoryKv::new());
        let records = store(kv.clone());

        let mut record = ContentRecord::new("E1", SlotContent::event("Old title"));
        record.link("event", 1);
        records.persist(&record).await.unwrap();

        let updated = records
            .upsert_payload("E1", SlotContent::event("New title"))
            .await
            .unwrap();
        assert_eq!(updated.slot_in("event"), Some(1));

        let slot_copy: ContentRecord =
            serde_json::from_str(&kv.get("event-slot-1").await.unwrap().unwrap()).unwrap();
        assert_eq!(slot_copy.content.title(), "New title");
    }

    #[tokio::test]
    async fn upsert_with_stale_claim_does_not_clobber_occupant() {
        let kv = Arc::new(InMemoryKv::new());
        let records = store(kv.clone());

        let mut other = ContentRecord::new("E2", SlotContent::event("Occupant"));
        other.link("event", 1);
        records.persist(&other).await.unwrap();

        // E1 claims slot 1 but does not hold it
        let mut stale = ContentRecord::new("E1", SlotContent::event("Stale"));
        stale.link("event", 1);
        records.write_record_only(&stale).await.unwrap();

        let updated = records
            .upsert_payload("E1", SlotContent::event("Fresh"))
            .await
            .unwrap();
        assert_eq!(updated.slot_number, None);

        let occupant: ContentRecord =
            serde_json::from_str(&kv.get("event-slot-1").await.unwrap().unwrap()).unwrap();
        assert_eq!(occupant.id, "E2");
    }

    #[tokio::test]
    async fn ids_aliasing_board_keys_are_rejected() {
        let kv = Arc::new(InMemoryKv::new());
        let records = store(kv.clone());

        assert!(records.check_id("E1").is_ok());
        let err = records
            .upsert_payload("event-slot-3", SlotContent::event("Sneaky"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(records.check_id("event-index").is_err());
        assert!(kv.is_empty().await);
    }

    #[tokio::test]
    async fn undecodable_records_read_as_missing() {
        let kv = Arc::new(InMemoryKv::new());
        let records = store(kv.clone());
        records
            .persist(&ContentRecord::new("E1", SlotContent::event("Fair")))
            .await
            .unwrap();
        kv.set("E2", "garbage".into()).await.unwrap();

        assert!(records.get("E2").await.unwrap().is_none());
        let found = records
            .get_many(&["E1".to_string(), "E2".to_string()])
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert!(found.contains_key("E1"));
    }
}
