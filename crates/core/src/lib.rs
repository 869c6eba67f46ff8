//! # Slotboard Core
//!
//! Domain types, traits, and error definitions for the slotboard content
//! slot engine. This crate has **zero framework dependencies** — it defines
//! the domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! The key-value store is defined as a trait here. Implementations live in
//! `slotboard-store`; the slot algorithms live in `slotboard-engine`. This
//! enables:
//! - Swapping storage backends via configuration
//! - Easy testing with in-memory or failure-injecting backends
//! - Clean dependency graph (all crates depend inward on core)

pub mod cancel;
pub mod content;
pub mod error;
pub mod event;
pub mod kv;
pub mod scope;

// Re-export key types at crate root for ergonomics
pub use cancel::CancelToken;
pub use content::{ContentKind, ContentRecord, SlotContent, SlotEntry};
pub use error::{Error, KvError, Result};
pub use event::{EventBus, SlotEvent};
pub use kv::{KvBackend, KvOp};
pub use scope::{DeleteMode, KeyLayout, OverflowPolicy, ScopeConfig, is_board_key};
