//! Slot events — notifications about board changes.
//!
//! Events are published whenever the engine moves content. Downstream
//! consumers (search re-indexing, cache purges, pub/sub bridges) subscribe
//! without coupling to the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All slot events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotEvent {
    /// Content written into a slot
    Placed {
        scope: String,
        content_id: String,
        slot: u32,
        timestamp: DateTime<Utc>,
    },

    /// An occupant moved to make or close a gap
    Shifted {
        scope: String,
        content_id: String,
        from: u32,
        to: u32,
        timestamp: DateTime<Utc>,
    },

    /// The tail occupant fell off a full board
    Evicted {
        scope: String,
        content_id: String,
        slot: u32,
        timestamp: DateTime<Utc>,
    },

    /// Content deleted from a board
    Removed {
        scope: String,
        content_id: String,
        slot: u32,
        purged: bool,
        timestamp: DateTime<Utc>,
    },

    /// A board's layout was replaced wholesale
    Reordered {
        scope: String,
        occupied: usize,
        timestamp: DateTime<Utc>,
    },

    /// The persisted index disagreed with the slot keys and was rewritten
    IndexHealed {
        scope: String,
        timestamp: DateTime<Utc>,
    },

    /// A record's slot number disagreed with its slot key and was rewritten
    RecordHealed {
        scope: String,
        content_id: String,
        slot: u32,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for slot events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<SlotEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: SlotEvent) {
        // No subscribers is fine
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<SlotEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
