//! Slot Assignment Engine — bounded, gap-free, user-orderable boards.
//!
//! A board is `capacity` slot keys in a key-value store that only offers
//! per-key writes. Every operation here reads the board once, plans against
//! that snapshot, applies its writes one key at a time, and finishes with a
//! Rebuild so the index and the denormalized `slot_number` fields converge
//! on whatever the slot keys say.
//!
//! There is no locking: one writer per scope is assumed. A failed or
//! cancelled operation leaves its completed writes in place; calling
//! [`SlotEngine::rebuild`] afterwards restores a consistent index.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use slotboard_core::{
    CancelToken, ContentRecord, DeleteMode, Error, EventBus, KvBackend, OverflowPolicy, Result,
    ScopeConfig, SlotContent, SlotEntry, SlotEvent,
};

use crate::index::SlotIndex;
use crate::records::{ContentStore, validate_content_id};

/// One occupant moving between slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotMove {
    pub content_id: String,
    pub from: u32,
    pub to: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOutcome {
    pub slot: u32,
    pub shifted: Vec<SlotMove>,
    pub evicted: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub slot: u32,
    pub shifted: Vec<SlotMove>,
    pub purged: bool,
}

/// A requested slot in a batch reorder. `content_id: None` leaves the slot empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAssignment {
    pub slot: u32,
    #[serde(default)]
    pub content_id: Option<String>,
}

impl SlotAssignment {
    pub fn new(slot: u32, content_id: impl Into<String>) -> Self {
        Self {
            slot,
            content_id: Some(content_id.into()),
        }
    }

    pub fn empty(slot: u32) -> Self {
        Self {
            slot,
            content_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebuildReport {
    pub entries: Vec<SlotEntry>,
    /// The persisted index was missing or disagreed with the slot keys
    pub index_was_stale: bool,
    /// Records whose `slotNumber` was rewritten to match their slot key
    pub healed_records: Vec<String>,
    /// Content ids found in more than one slot
    pub duplicates: Vec<String>,
}

/// Snapshot of every slot, index 0 is slot 1.
type Board = Vec<Option<ContentRecord>>;

/// The shared engine behind every board kind.
#[derive(Clone)]
pub struct SlotEngine {
    scope: ScopeConfig,
    kv: Arc<dyn KvBackend>,
    records: ContentStore,
    events: Option<Arc<EventBus>>,
}

impl SlotEngine {
    pub fn new(kv: Arc<dyn KvBackend>, scope: ScopeConfig) -> Result<Self> {
        scope.validate()?;
        let records = ContentStore::new(kv.clone(), scope.clone());
        Ok(Self {
            scope,
            kv,
            records,
            events: None,
        })
    }

    /// Publish slot events on `bus`.
    pub fn with_events(mut self, bus: Arc<EventBus>) -> Self {
        self.events = Some(bus);
        self
    }

    pub fn scope(&self) -> &ScopeConfig {
        &self.scope
    }

    pub fn records(&self) -> &ContentStore {
        &self.records
    }

    // ── Place ─────────────────────────────────────────────────────────────

    /// Put `content_id` at `slot`, shifting occupants toward the tail.
    ///
    /// With `payload` the record is created or its content replaced; without
    /// it the record must already exist. Content already on this board is
    /// moved rather than duplicated. A full board evicts its last occupant
    /// or fails with `CapacityExceeded`, depending on the overflow policy.
    pub async fn place(
        &self,
        slot: u32,
        content_id: &str,
        payload: Option<SlotContent>,
        cancel: &CancelToken,
    ) -> Result<PlaceOutcome> {
        self.scope.check_slot(slot)?;
        self.records.check_id(content_id)?;
        cancel.check()?;

        let mut record = match (self.records.get(content_id).await?, payload) {
            (Some(mut existing), Some(content)) => {
                existing.content = content;
                existing
            }
            (Some(existing), None) => existing,
            (None, Some(content)) => ContentRecord::new(content_id, content),
            (None, None) => {
                return Err(Error::NotFound(format!("content '{content_id}' does not exist")));
            }
        };

        let mut board = self.read_board().await?;
        let mut outcome = PlaceOutcome {
            slot,
            shifted: Vec::new(),
            evicted: None,
        };

        let current = board
            .iter()
            .position(|s| s.as_ref().is_some_and(|r| r.id == content_id))
            .map(|i| i as u32 + 1);

        match current {
            Some(current) if current == slot => {
                // Already there; refresh the payload in place
                cancel.check()?;
                record.link(&self.scope.name, slot);
                self.records.persist(&record).await?;
                self.reconcile(cancel, false).await?;
                return Ok(outcome);
            }
            Some(current) => {
                debug!(scope = %self.scope.name, content_id, from = current, to = slot, "Moving content within board");
                cancel.check()?;
                self.kv.delete(&self.scope.layout.slot_key(current)).await?;
                board[current as usize - 1] = None;
                let moves = self.collapse(&mut board, current, cancel).await?;
                outcome.shifted.extend(moves);
            }
            None => {}
        }

        let target = slot as usize - 1;
        if board[target].is_some() {
            let first_empty = (target + 1..board.len()).find(|&i| board[i].is_none());
            let gap = match first_empty {
                Some(gap) => gap,
                None => {
                    let tail = board.len() - 1;
                    match self.scope.overflow {
                        OverflowPolicy::Reject => {
                            return Err(Error::CapacityExceeded {
                                scope: self.scope.name.clone(),
                                capacity: self.scope.capacity,
                            });
                        }
                        OverflowPolicy::EvictTail => {
                            outcome.evicted = self.evict(&mut board, tail, cancel).await?;
                            tail
                        }
                    }
                }
            };

            // High to low so no occupant is overwritten before it is read
            for i in (target..gap).rev() {
                if let Some(moved) = self.move_occupant(&mut board, i, i + 1, cancel).await? {
                    outcome.shifted.push(moved);
                }
            }
        }

        cancel.check()?;
        record.link(&self.scope.name, slot);
        self.records.persist(&record).await?;

        self.emit(SlotEvent::Placed {
            scope: self.scope.name.clone(),
            content_id: content_id.to_string(),
            slot,
            timestamp: Utc::now(),
        });
        info!(
            scope = %self.scope.name,
            content_id,
            slot,
            shifted = outcome.shifted.len(),
            evicted = outcome.evicted.as_deref().unwrap_or("-"),
            "Content placed"
        );

        self.reconcile(cancel, false).await?;
        Ok(outcome)
    }

    // ── Reorder ───────────────────────────────────────────────────────────

    /// Replace the whole layout of the board.
    ///
    /// Everything is validated before the first write: slot numbers must be
    /// unique and within `1..=capacity`, content ids unique and existing.
    pub async fn reorder(
        &self,
        assignments: Vec<SlotAssignment>,
        cancel: &CancelToken,
    ) -> Result<Vec<SlotEntry>> {
        let mut slots = HashSet::new();
        let mut ids: Vec<String> = Vec::new();
        for assignment in &assignments {
            self.scope.check_slot(assignment.slot)?;
            if !slots.insert(assignment.slot) {
                return Err(Error::Validation(format!(
                    "slot {} assigned more than once",
                    assignment.slot
                )));
            }
            if let Some(id) = &assignment.content_id {
                self.records.check_id(id)?;
                if ids.contains(id) {
                    return Err(Error::Validation(format!(
                        "content '{id}' assigned to more than one slot"
                    )));
                }
                ids.push(id.clone());
            }
        }

        let mut wanted = self.records.get_many(&ids).await?;
        if let Some(missing) = ids.iter().find(|id| !wanted.contains_key(*id)) {
            return Err(Error::NotFound(format!("content '{missing}' does not exist")));
        }

        cancel.check()?;
        let board = self.read_board().await?;

        // Clear every occupied slot key
        let mut previous: Vec<String> = Vec::new();
        for (i, occupant) in board.iter().enumerate() {
            if let Some(occupant) = occupant {
                cancel.check()?;
                self.kv.delete(&self.scope.layout.slot_key(i as u32 + 1)).await?;
                previous.push(occupant.id.clone());
            }
        }

        // Unlink content that drops off the board
        let dropped: Vec<String> = previous
            .into_iter()
            .filter(|id| !ids.contains(id))
            .collect();
        for (id, mut record) in self.records.get_many(&dropped).await? {
            if record.slot_in(&self.scope.name).is_some() {
                cancel.check()?;
                record.unlink();
                self.records.write_record_only(&record).await?;
                debug!(scope = %self.scope.name, content_id = %id, "Unlinked by reorder");
            }
        }

        let mut ordered: Vec<&SlotAssignment> = assignments
            .iter()
            .filter(|a| a.content_id.is_some())
            .collect();
        ordered.sort_by_key(|a| a.slot);
        for assignment in ordered {
            let Some(id) = assignment.content_id.as_deref() else {
                continue;
            };
            let Some(mut record) = wanted.remove(id) else {
                continue;
            };
            cancel.check()?;
            record.link(&self.scope.name, assignment.slot);
            self.records.persist(&record).await?;
        }

        let report = self.reconcile(cancel, false).await?;
        self.emit(SlotEvent::Reordered {
            scope: self.scope.name.clone(),
            occupied: report.entries.len(),
            timestamp: Utc::now(),
        });
        info!(scope = %self.scope.name, occupied = report.entries.len(), "Board reordered");
        Ok(report.entries)
    }

    // ── Delete ────────────────────────────────────────────────────────────

    /// Remove content from the board and close the gap it leaves.
    pub async fn delete(&self, content_id: &str, cancel: &CancelToken) -> Result<DeleteOutcome> {
        validate_content_id(content_id)?;
        cancel.check()?;

        let record = self.records.get(content_id).await?;
        let mut board = self.read_board().await?;
        let holds = |slot: u32, board: &Board| {
            board
                .get(slot as usize - 1)
                .and_then(Option::as_ref)
                .is_some_and(|r| r.id == content_id)
        };

        let claimed = record
            .as_ref()
            .and_then(|r| r.slot_in(&self.scope.name))
            .filter(|s| (1..=self.scope.capacity).contains(s));
        let slot = match claimed {
            Some(s) if holds(s, &board) => s,
            _ => {
                let found = board
                    .iter()
                    .position(|s| s.as_ref().is_some_and(|r| r.id == content_id))
                    .map(|i| i as u32 + 1);
                match found {
                    Some(s) => {
                        warn!(
                            scope = %self.scope.name,
                            content_id,
                            claimed = ?claimed,
                            actual = s,
                            "Record slot number diverged from slot keys"
                        );
                        s
                    }
                    None => {
                        return Err(Error::NotFound(format!(
                            "content '{content_id}' is not placed on board '{}'",
                            self.scope.name
                        )));
                    }
                }
            }
        };

        cancel.check()?;
        self.kv.delete(&self.scope.layout.slot_key(slot)).await?;
        let slot_copy = board[slot as usize - 1].take();

        let purged = self.scope.delete_mode == DeleteMode::Purge;
        cancel.check()?;
        if purged {
            self.records.remove(content_id).await?;
        } else if let Some(mut unlinked) = record.or(slot_copy) {
            unlinked.unlink();
            self.records.write_record_only(&unlinked).await?;
        }

        let shifted = self.collapse(&mut board, slot, cancel).await?;

        self.emit(SlotEvent::Removed {
            scope: self.scope.name.clone(),
            content_id: content_id.to_string(),
            slot,
            purged,
            timestamp: Utc::now(),
        });
        info!(scope = %self.scope.name, content_id, slot, purged, shifted = shifted.len(), "Content removed");

        self.reconcile(cancel, false).await?;
        Ok(DeleteOutcome {
            slot,
            shifted,
            purged,
        })
    }

    // ── Rebuild / List ────────────────────────────────────────────────────

    /// Re-derive the index from a full scan of the slot keys.
    ///
    /// Also rewrites any record whose `slot_number` disagrees with the slot
    /// that holds it. Idempotent; safe to call at any time.
    pub async fn rebuild(&self, cancel: &CancelToken) -> Result<RebuildReport> {
        self.reconcile(cancel, true).await
    }

    /// Scan, heal records, and persist the index. After a mutation the old
    /// index is expected to be stale, so `audit` is off and that is not
    /// reported as healing.
    async fn reconcile(&self, cancel: &CancelToken, audit: bool) -> Result<RebuildReport> {
        cancel.check()?;
        let board = self.read_board().await?;

        let occupant_ids: Vec<String> = board.iter().flatten().map(|r| r.id.clone()).collect();
        let stored = self.records.get_many(&occupant_ids).await?;

        let mut entries = Vec::with_capacity(occupant_ids.len());
        let mut healed_records = Vec::new();
        let mut duplicates = Vec::new();
        let mut seen = HashSet::new();

        for (i, occupant) in board.into_iter().enumerate() {
            let Some(slot_copy) = occupant else { continue };
            let slot = i as u32 + 1;

            if !seen.insert(slot_copy.id.clone()) {
                warn!(scope = %self.scope.name, content_id = %slot_copy.id, slot, "Content occupies more than one slot");
                duplicates.push(slot_copy.id.clone());
                entries.push(SlotEntry {
                    slot,
                    content_id: slot_copy.id.clone(),
                    record: slot_copy,
                });
                continue;
            }

            let record_key_copy = stored.get(&slot_copy.id);
            let diverged = slot_copy.slot_in(&self.scope.name) != Some(slot)
                || record_key_copy.is_none_or(|r| r.slot_in(&self.scope.name) != Some(slot));

            let mut record = record_key_copy.cloned().unwrap_or(slot_copy);
            if diverged {
                cancel.check()?;
                record.link(&self.scope.name, slot);
                self.records.persist(&record).await?;
                warn!(scope = %self.scope.name, content_id = %record.id, slot, "Healed record slot number");
                self.emit(SlotEvent::RecordHealed {
                    scope: self.scope.name.clone(),
                    content_id: record.id.clone(),
                    slot,
                    timestamp: Utc::now(),
                });
                healed_records.push(record.id.clone());
            }

            entries.push(SlotEntry {
                slot,
                content_id: record.id.clone(),
                record,
            });
        }

        let scanned = SlotIndex::from_entries(&entries);
        let persisted = SlotIndex::load(self.kv.as_ref(), &self.scope.layout).await?;
        let index_was_stale = persisted.as_ref() != Some(&scanned);
        if audit && index_was_stale && persisted.is_some() {
            warn!(scope = %self.scope.name, "Slot index disagreed with slot keys; rewriting");
            self.emit(SlotEvent::IndexHealed {
                scope: self.scope.name.clone(),
                timestamp: Utc::now(),
            });
        }

        cancel.check()?;
        scanned.persist(self.kv.as_ref(), &self.scope.layout).await?;
        debug!(scope = %self.scope.name, occupied = entries.len(), index_was_stale, "Index rebuilt");

        Ok(RebuildReport {
            entries,
            index_was_stale,
            healed_records,
            duplicates,
        })
    }

    /// Occupied slots in ascending order.
    ///
    /// Reads every slot key in one bulk request and serves that when the
    /// persisted index agrees with it; any disagreement, in either
    /// direction, falls back to a Rebuild so the index heals.
    pub async fn list(&self) -> Result<Vec<SlotEntry>> {
        let index = SlotIndex::load(self.kv.as_ref(), &self.scope.layout).await?;
        let entries: Vec<SlotEntry> = self
            .read_board()
            .await?
            .into_iter()
            .enumerate()
            .filter_map(|(i, occupant)| {
                occupant.map(|record| SlotEntry {
                    slot: i as u32 + 1,
                    content_id: record.id.clone(),
                    record,
                })
            })
            .collect();

        match index {
            Some(index) if index == SlotIndex::from_entries(&entries) => Ok(entries),
            Some(_) => {
                warn!(scope = %self.scope.name, "Index disagrees with slot keys; rebuilding");
                Ok(self.rebuild(&CancelToken::new()).await?.entries)
            }
            None => {
                debug!(scope = %self.scope.name, "No usable index; scanning board");
                Ok(self.rebuild(&CancelToken::new()).await?.entries)
            }
        }
    }

    /// Create or update a record's payload without changing placement.
    pub async fn upsert_content(&self, content_id: &str, content: SlotContent) -> Result<ContentRecord> {
        self.records.upsert_payload(content_id, content).await
    }

    // ── Internals ─────────────────────────────────────────────────────────

    /// Read every slot key in one bulk request.
    async fn read_board(&self) -> Result<Board> {
        let values = self.kv.bulk_get(&self.scope.slot_keys()).await?;
        let board = values
            .into_iter()
            .map(|(key, raw)| {
                raw.and_then(|raw| match serde_json::from_str::<ContentRecord>(&raw) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(scope = %self.scope.name, %key, error = %e, "Unreadable slot value treated as empty");
                        None
                    }
                })
            })
            .collect();
        Ok(board)
    }

    /// Move the occupant at board index `from` to index `to`.
    async fn move_occupant(
        &self,
        board: &mut Board,
        from: usize,
        to: usize,
        cancel: &CancelToken,
    ) -> Result<Option<SlotMove>> {
        let Some(mut record) = board[from].take() else {
            return Ok(None);
        };
        cancel.check()?;

        let (from_slot, to_slot) = (from as u32 + 1, to as u32 + 1);
        record.link(&self.scope.name, to_slot);
        self.records.persist(&record).await?;
        debug!(scope = %self.scope.name, content_id = %record.id, from = from_slot, to = to_slot, "Shifted");

        self.emit(SlotEvent::Shifted {
            scope: self.scope.name.clone(),
            content_id: record.id.clone(),
            from: from_slot,
            to: to_slot,
            timestamp: Utc::now(),
        });
        let moved = SlotMove {
            content_id: record.id.clone(),
            from: from_slot,
            to: to_slot,
        };
        board[to] = Some(record);
        Ok(Some(moved))
    }

    /// Pull the run of occupants after the empty `gap_slot` one step inward,
    /// stopping at the next gap.
    async fn collapse(
        &self,
        board: &mut Board,
        gap_slot: u32,
        cancel: &CancelToken,
    ) -> Result<Vec<SlotMove>> {
        let mut moves = Vec::new();
        let mut last_vacated = None;

        for i in gap_slot as usize..board.len() {
            match self.move_occupant(board, i, i - 1, cancel).await? {
                Some(moved) => {
                    last_vacated = Some(moved.from);
                    moves.push(moved);
                }
                None => break,
            }
        }

        // The last mover's old key still holds a stale copy
        if let Some(slot) = last_vacated {
            cancel.check()?;
            self.kv.delete(&self.scope.layout.slot_key(slot)).await?;
        }
        Ok(moves)
    }

    /// Drop the occupant at board index `tail` off the board.
    async fn evict(&self, board: &mut Board, tail: usize, cancel: &CancelToken) -> Result<Option<String>> {
        let Some(slot_copy) = board[tail].take() else {
            return Ok(None);
        };
        cancel.check()?;

        let slot = tail as u32 + 1;
        let stored = self.records.get(&slot_copy.id).await?;
        let mut record = stored.unwrap_or(slot_copy);
        record.unlink();
        self.records.write_record_only(&record).await?;
        self.kv.delete(&self.scope.layout.slot_key(slot)).await?;

        warn!(scope = %self.scope.name, content_id = %record.id, slot, "Board full; evicted tail occupant");
        self.emit(SlotEvent::Evicted {
            scope: self.scope.name.clone(),
            content_id: record.id.clone(),
            slot,
            timestamp: Utc::now(),
        });
        Ok(Some(record.id))
    }

    fn emit(&self, event: SlotEvent) {
        if let Some(bus) = &self.events {
            bus.publish(event);
        }
    }
}
