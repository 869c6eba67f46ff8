//! Slot Index — a derived view of a board.
//!
//! Two keys per scope: a `slot -> content id` map and the content ids in
//! slot order. The physical slot keys are authoritative; the index is only a
//! cache and is recomputed wholesale by Rebuild.

use std::collections::BTreeMap;

use slotboard_core::kv::set_json;
use slotboard_core::{KeyLayout, KvBackend, Result, SlotEntry};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotIndex {
    slots: BTreeMap<u32, String>,
}

impl SlotIndex {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, String)>) -> Self {
        Self {
            slots: pairs.into_iter().collect(),
        }
    }

    pub fn from_entries(entries: &[SlotEntry]) -> Self {
        Self::from_pairs(entries.iter().map(|e| (e.slot, e.content_id.clone())))
    }

    pub fn ordered_ids(&self) -> Vec<String> {
        self.slots.values().cloned().collect()
    }

    /// Load the persisted index.
    ///
    /// `None` when either key is missing, unparsable, or the two keys
    /// disagree with each other.
    pub async fn load(kv: &dyn KvBackend, layout: &KeyLayout) -> Result<Option<Self>> {
        let keys = [layout.slot_index_key.clone(), layout.content_index_key.clone()];
        let mut values = kv.bulk_get(&keys).await?.into_iter().map(|(_, v)| v);
        let (Some(Some(raw_slots)), Some(Some(raw_ids))) = (values.next(), values.next()) else {
            return Ok(None);
        };

        let slots: BTreeMap<u32, String> = match serde_json::from_str(&raw_slots) {
            Ok(slots) => slots,
            Err(e) => {
                warn!(key = %layout.slot_index_key, error = %e, "Unreadable slot index");
                return Ok(None);
            }
        };
        let ids: Vec<String> = match serde_json::from_str(&raw_ids) {
            Ok(ids) => ids,
            Err(e) => {
                warn!(key = %layout.content_index_key, error = %e, "Unreadable content index");
                return Ok(None);
            }
        };

        let index = Self { slots };
        if index.ordered_ids() != ids {
            warn!(
                key = %layout.content_index_key,
                "Content index disagrees with slot index"
            );
            return Ok(None);
        }
        Ok(Some(index))
    }

    /// Overwrite both index keys.
    pub async fn persist(&self, kv: &dyn KvBackend, layout: &KeyLayout) -> Result<()> {
        set_json(kv, &layout.slot_index_key, &self.slots).await?;
        set_json(kv, &layout.content_index_key, &self.ordered_ids()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotboard_core::ScopeConfig;
    use slotboard_store::InMemoryKv;

    fn sample() -> SlotIndex {
        SlotIndex::from_pairs([(4, "B".to_string()), (1, "A".to_string())])
    }

    #[test]
    fn ordered_by_slot() {
        assert_eq!(sample().ordered_ids(), vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn persisted_format_is_stable() {
        let kv = InMemoryKv::new();
        let layout = ScopeConfig::topic_board("sports").unwrap().layout;
        sample().persist(&kv, &layout).await.unwrap();

        assert_eq!(
            kv.get("daily-sports-slots-index").await.unwrap().as_deref(),
            Some(r#"{"1":"A","4":"B"}"#)
        );
        assert_eq!(
            kv.get("daily-sports-index").await.unwrap().as_deref(),
            Some(r#"["A","B"]"#)
        );
        assert_eq!(SlotIndex::load(&kv, &layout).await.unwrap(), Some(sample()));
    }

    #[tokio::test]
    async fn missing_or_disagreeing_index_loads_as_none() {
        let kv = InMemoryKv::new();
        let layout = ScopeConfig::daily_top().layout;
        assert_eq!(SlotIndex::load(&kv, &layout).await.unwrap(), None);

        kv.set("daily-slots-index", r#"{"1":"A"}"#.into()).await.unwrap();
        assert_eq!(SlotIndex::load(&kv, &layout).await.unwrap(), None);

        kv.set("daily-index", r#"["Z"]"#.into()).await.unwrap();
        assert_eq!(SlotIndex::load(&kv, &layout).await.unwrap(), None);

        kv.set("daily-index", "not json".into()).await.unwrap();
        assert_eq!(SlotIndex::load(&kv, &layout).await.unwrap(), None);

        kv.set("daily-index", r#"["A"]"#.into()).await.unwrap();
        assert!(SlotIndex::load(&kv, &layout).await.unwrap().is_some());
    }
}
