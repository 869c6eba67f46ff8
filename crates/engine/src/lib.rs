//! # slotboard-engine
//!
//! Fixed-capacity, gap-free, user-orderable content boards kept in a
//! key-value store with per-key writes only.
//!
//! - [`SlotEngine`] — Place, Reorder, Delete, List and Rebuild for one board
//! - [`ContentStore`] — content records and their dual-written slot copies
//! - [`SlotIndex`] — the derived `slot -> content id` cache
//! - [`Boards`] — configured engines for the event, daily and topic boards

pub mod boards;
pub mod engine;
pub mod index;
pub mod records;

pub use boards::{BoardRef, Boards};
pub use engine::{
    DeleteOutcome, PlaceOutcome, RebuildReport, SlotAssignment, SlotEngine, SlotMove,
};
pub use index::SlotIndex;
pub use records::{ContentStore, validate_content_id};
