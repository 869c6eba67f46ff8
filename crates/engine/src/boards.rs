//! Board registry — maps board names to configured engines.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use slotboard_config::BoardsConfig;
use slotboard_core::scope::validate_topic_id;
use slotboard_core::{Error, EventBus, KvBackend, Result, ScopeConfig};

use crate::engine::SlotEngine;

/// A board as named in requests: `event`, `daily` or `topic-<topicId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BoardRef {
    Event,
    Daily,
    Topic(String),
}

impl FromStr for BoardRef {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "event" => Ok(Self::Event),
            "daily" => Ok(Self::Daily),
            other => match other.strip_prefix("topic-") {
                Some(topic_id) => {
                    validate_topic_id(topic_id)?;
                    Ok(Self::Topic(topic_id.to_string()))
                }
                None => Err(Error::Validation(format!(
                    "unknown board '{other}' (expected event, daily or topic-<id>)"
                ))),
            },
        }
    }
}

impl fmt::Display for BoardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => f.write_str("event"),
            Self::Daily => f.write_str("daily"),
            Self::Topic(id) => write!(f, "topic-{id}"),
        }
    }
}

impl TryFrom<String> for BoardRef {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BoardRef> for String {
    fn from(board: BoardRef) -> Self {
        board.to_string()
    }
}

/// Owns the shared store handle and event bus; hands out engines per board.
#[derive(Clone)]
pub struct Boards {
    kv: Arc<dyn KvBackend>,
    events: Arc<EventBus>,
    settings: BoardsConfig,
}

impl Boards {
    pub fn new(kv: Arc<dyn KvBackend>, settings: BoardsConfig) -> Self {
        Self {
            kv,
            events: Arc::new(EventBus::default()),
            settings,
        }
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn backend_name(&self) -> &str {
        self.kv.name()
    }

    pub fn event(&self) -> Result<SlotEngine> {
        self.engine(self.settings.event.apply(ScopeConfig::event_carousel()))
    }

    pub fn daily(&self) -> Result<SlotEngine> {
        self.engine(self.settings.daily.apply(ScopeConfig::daily_top()))
    }

    pub fn topic(&self, topic_id: &str) -> Result<SlotEngine> {
        self.engine(self.settings.topic.apply(ScopeConfig::topic_board(topic_id)?))
    }

    pub fn resolve(&self, board: &BoardRef) -> Result<SlotEngine> {
        match board {
            BoardRef::Event => self.event(),
            BoardRef::Daily => self.daily(),
            BoardRef::Topic(topic_id) => self.topic(topic_id),
        }
    }

    fn engine(&self, scope: ScopeConfig) -> Result<SlotEngine> {
        Ok(SlotEngine::new(self.kv.clone(), scope)?.with_events(self.events.clone()))
    }
}
