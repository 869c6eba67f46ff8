//! Content records — the payloads that occupy slots.
//!
//! A board can mix articles, events and videos, so the payload is a tagged
//! union with an explicit `contentType` discriminant. Placement lives on the
//! record itself (`scope` + `slot_number`), denormalized from the slot keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of content held in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Event,
    Video,
}

/// The payload of a piece of slot content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "contentType", rename_all = "camelCase")]
pub enum SlotContent {
    #[serde(rename_all = "camelCase")]
    Article {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        summary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Event {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        venue: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        starts_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ends_at: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Video {
        title: String,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thumbnail_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_secs: Option<u32>,
    },
}

impl SlotContent {
    pub fn kind(&self) -> ContentKind {
        match self {
            SlotContent::Article { .. } => ContentKind::Article,
            SlotContent::Event { .. } => ContentKind::Event,
            SlotContent::Video { .. } => ContentKind::Video,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            SlotContent::Article { title, .. }
            | SlotContent::Event { title, .. }
            | SlotContent::Video { title, .. } => title,
        }
    }

    /// Shorthand for an article with only a title.
    pub fn article(title: impl Into<String>) -> Self {
        SlotContent::Article {
            title: title.into(),
            summary: None,
            url: None,
            image_url: None,
            topic_id: None,
        }
    }

    /// Shorthand for an event with only a title.
    pub fn event(title: impl Into<String>) -> Self {
        SlotContent::Event {
            title: title.into(),
            venue: None,
            starts_at: None,
            ends_at: None,
            image_url: None,
        }
    }
}

/// A persisted content record.
///
/// Stored under the scope's record key and duplicated under whichever slot
/// key currently holds it. `slot_number` must match that slot key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,

    /// Scope the record is placed in, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    /// Current slot within `scope`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_number: Option<u32>,

    /// Featured/placed flag; cleared on eviction
    #[serde(default)]
    pub featured: bool,

    pub content: SlotContent,

    pub updated_at: DateTime<Utc>,
}

impl ContentRecord {
    pub fn new(id: impl Into<String>, content: SlotContent) -> Self {
        Self {
            id: id.into(),
            scope: None,
            slot_number: None,
            featured: false,
            content,
            updated_at: Utc::now(),
        }
    }

    /// Mark the record as occupying `slot` in `scope`.
    pub fn link(&mut self, scope: &str, slot: u32) {
        self.scope = Some(scope.to_string());
        self.slot_number = Some(slot);
        self.featured = true;
        self.updated_at = Utc::now();
    }

    /// Clear placement and the featured flag.
    pub fn unlink(&mut self) {
        self.scope = None;
        self.slot_number = None;
        self.featured = false;
        self.updated_at = Utc::now();
    }

    /// The slot this record claims in `scope`, if any.
    pub fn slot_in(&self, scope: &str) -> Option<u32> {
        match (&self.scope, self.slot_number) {
            (Some(s), Some(n)) if s == scope => Some(n),
            _ => None,
        }
    }
}

/// One occupied slot as returned by a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotEntry {
    pub slot: u32,
    pub content_id: String,
    pub record: ContentRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_discriminant_is_serialized() {
        let json = serde_json::to_value(SlotContent::Video {
            title: "Launch".into(),
            url: "https://example.com/v.mp4".into(),
            thumbnail_url: None,
            duration_secs: Some(90),
        })
        .unwrap();
        assert_eq!(json["contentType"], "video");
        assert_eq!(json["durationSecs"], 90);
        assert!(json.get("thumbnailUrl").is_none());
    }

    #[test]
    fn record_parses_from_camel_case() {
        let raw = r#"{
            "id": "E1",
            "scope": "event",
            "slotNumber": 3,
            "featured": true,
            "content": {"contentType": "event", "title": "Fair", "venue": "Hall A"},
            "updatedAt": "2025-01-01T00:00:00Z"
        }"#;
        let record: ContentRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.slot_in("event"), Some(3));
        assert_eq!(record.slot_in("daily"), None);
        assert_eq!(record.content.kind(), ContentKind::Event);
        assert_eq!(record.content.title(), "Fair");
    }

    #[test]
    fn link_then_unlink_clears_placement() {
        let mut record = ContentRecord::new("A", SlotContent::article("Hello"));
        record.link("daily", 4);
        assert!(record.featured);
        assert_eq!(record.slot_in("daily"), Some(4));

        record.unlink();
        assert!(!record.featured);
        assert_eq!(record.slot_number, None);
        assert_eq!(record.scope, None);
    }
}
