//! Scope configuration — one bounded, slot-numbered board.
//!
//! The event carousel, the daily top section and every per-topic board run
//! the same engine; they differ only in name, capacity, key templates, and
//! the policies below. Key templates are stable storage formats and must
//! not change for existing data.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest capacity a board may be configured with.
pub const MAX_CAPACITY: u32 = 64;

/// Capacity of the featured events carousel.
pub const EVENT_CAPACITY: u32 = 6;

/// Capacity of the daily top section and of each per-topic board.
pub const DAILY_CAPACITY: u32 = 9;

/// What `Place` does when every slot is occupied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the occupant of the last slot (default)
    #[default]
    EvictTail,
    /// Fail with `CapacityExceeded` before writing anything
    Reject,
}

/// What `Delete` does with the removed content's own record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    /// Keep the record, clear its placement
    #[default]
    Unlink,
    /// Delete the record key as well
    Purge,
}

/// Key templates for one scope.
///
/// `{n}` is replaced with the slot number, `{id}` with the content id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyLayout {
    pub slot_template: String,
    pub record_template: String,
    pub slot_index_key: String,
    pub content_index_key: String,
}

impl KeyLayout {
    pub fn slot_key(&self, slot: u32) -> String {
        self.slot_template.replace("{n}", &slot.to_string())
    }

    pub fn record_key(&self, content_id: &str) -> String {
        self.record_template.replace("{id}", content_id)
    }
}

/// A fully resolved board definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub name: String,
    pub capacity: u32,
    pub layout: KeyLayout,
    #[serde(default)]
    pub overflow: OverflowPolicy,
    #[serde(default)]
    pub delete_mode: DeleteMode,
}

impl ScopeConfig {
    /// The featured events carousel.
    pub fn event_carousel() -> Self {
        Self {
            name: "event".into(),
            capacity: EVENT_CAPACITY,
            layout: KeyLayout {
                slot_template: "event-slot-{n}".into(),
                record_template: "{id}".into(),
                slot_index_key: "event-slots-index".into(),
                content_index_key: "event-index".into(),
            },
            overflow: OverflowPolicy::EvictTail,
            delete_mode: DeleteMode::Unlink,
        }
    }

    /// The daily top-section board.
    pub fn daily_top() -> Self {
        Self {
            name: "daily".into(),
            capacity: DAILY_CAPACITY,
            layout: KeyLayout {
                slot_template: "daily-slot-{n}".into(),
                record_template: "daily-content-{id}".into(),
                slot_index_key: "daily-slots-index".into(),
                content_index_key: "daily-index".into(),
            },
            overflow: OverflowPolicy::EvictTail,
            delete_mode: DeleteMode::Unlink,
        }
    }

    /// A per-topic board. Deleting from it removes the content record too.
    pub fn topic_board(topic_id: &str) -> Result<Self> {
        validate_topic_id(topic_id)?;
        Ok(Self {
            name: format!("topic-{topic_id}"),
            capacity: DAILY_CAPACITY,
            layout: KeyLayout {
                slot_template: format!("daily-{topic_id}-slot{{n}}"),
                record_template: format!("daily-{topic_id}-{{id}}"),
                slot_index_key: format!("daily-{topic_id}-slots-index"),
                content_index_key: format!("daily-{topic_id}-index"),
            },
            overflow: OverflowPolicy::EvictTail,
            delete_mode: DeleteMode::Purge,
        })
    }

    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Every slot key of this scope, slot 1 first.
    pub fn slot_keys(&self) -> Vec<String> {
        (1..=self.capacity).map(|n| self.layout.slot_key(n)).collect()
    }

    /// Reject content ids whose record key would land on a slot or index
    /// key, of this board or of any built-in board.
    pub fn check_record_key(&self, content_id: &str) -> Result<()> {
        let key = self.layout.record_key(content_id);
        let own = key == self.layout.slot_index_key
            || key == self.layout.content_index_key
            || self.slot_keys().contains(&key);
        if own || is_board_key(&key) {
            return Err(Error::Validation(format!(
                "content id '{content_id}' collides with board key '{key}'"
            )));
        }
        Ok(())
    }

    /// Reject slot numbers outside `1..=capacity`.
    pub fn check_slot(&self, slot: u32) -> Result<()> {
        if slot == 0 || slot > self.capacity {
            return Err(Error::Validation(format!(
                "slot {slot} is outside 1..={} for board '{}'",
                self.capacity, self.name
            )));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config {
                message: "board name must not be empty".into(),
            });
        }
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(Error::Config {
                message: format!(
                    "board '{}' capacity must be between 1 and {MAX_CAPACITY}, got {}",
                    self.name, self.capacity
                ),
            });
        }
        if !self.layout.slot_template.contains("{n}") {
            return Err(Error::Config {
                message: format!("board '{}' slot template lacks {{n}}", self.name),
            });
        }
        if !self.layout.record_template.contains("{id}") {
            return Err(Error::Config {
                message: format!("board '{}' record template lacks {{id}}", self.name),
            });
        }
        Ok(())
    }
}

/// Whether `key` has the shape of a slot or index key of a built-in board.
///
/// Topic boards share the `daily-` prefix, so a record key such as
/// `daily-a-b-slot1` would alias slot 1 of topic `a-b`.
pub fn is_board_key(key: &str) -> bool {
    let number = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());

    if let Some(rest) = key.strip_prefix("event-") {
        return rest == "index" || rest == "slots-index" || rest.strip_prefix("slot-").is_some_and(number);
    }
    let Some(rest) = key.strip_prefix("daily-") else {
        return false;
    };
    rest == "index"
        || rest.ends_with("-index")
        || rest.strip_prefix("slot-").is_some_and(number)
        || rest
            .rsplit_once("-slot")
            .is_some_and(|(topic, n)| !topic.is_empty() && number(n))
}

/// Topic ids end up inside storage keys.
pub fn validate_topic_id(topic_id: &str) -> Result<()> {
    let well_formed = !topic_id.is_empty()
        && topic_id.len() <= 64
        && topic_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !well_formed {
        return Err(Error::Validation(format!("invalid topic id '{topic_id}'")));
    }
    Ok(())
}
