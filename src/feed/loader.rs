//! Scroll-triggered pagination over the ranked id list.
//!
//! At most one batch is in flight: a batch starts by reserving `pending`
//! slots and every completion, successful or not, gives one back. The cursor
//! moves when a batch starts, so a slow batch is never requested twice.

use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::models::{Item, ItemId, Slot, SlotKey};

/// Capability that issues one fetch per id. The outcome comes back later
/// through [`BatchLoader::complete`].
pub trait ItemFetcher {
    fn fetch_item(&mut self, id: ItemId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    pub cursor: usize,
    pub batch_size: usize,
    /// Items requested but not completed yet.
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStart {
    /// Ids `first..first + requested` were requested.
    Started { first: usize, requested: usize },
    /// A previous batch has not settled.
    Busy { pending: usize },
    /// No ids are left past the cursor.
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// No live slot was waiting for this id.
    Ignored,
    /// The slot was filled; the batch still waits on `remaining` items.
    Pending { remaining: usize },
    /// The last outstanding item of the batch arrived.
    Settled,
    /// A retried slot was filled outside of any batch.
    Backfilled,
}

#[derive(Debug, Clone)]
struct Entry {
    id: ItemId,
    slot: Slot<Item>,
    // Counted in `pending` of the current batch
    in_batch: bool,
}

#[derive(Debug, Clone)]
pub struct BatchLoader {
    ids: Vec<ItemId>,
    state: PaginationState,
    entries: Vec<Entry>,
    index: HashMap<ItemId, usize>,
}

impl BatchLoader {
    pub fn new(batch_size: usize) -> Self {
        Self {
            ids: Vec::new(),
            state: PaginationState {
                cursor: 0,
                batch_size: batch_size.max(1),
                pending: 0,
            },
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Installs the ranked id list. Slots and cursor start over.
    pub fn set_ids(&mut self, ids: Vec<ItemId>) {
        info!(count = ids.len(), "received ranked id list");
        self.teardown();
        self.ids = ids;
    }

    /// Drops every slot and the id list. Completions still in flight are
    /// ignored when they arrive.
    pub fn teardown(&mut self) {
        self.ids.clear();
        self.entries.clear();
        self.index.clear();
        self.state.cursor = 0;
        self.state.pending = 0;
    }

    pub fn state(&self) -> PaginationState {
        self.state
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.cursor >= self.ids.len()
    }

    /// Slots in the order they were created.
    pub fn slots(&self) -> impl Iterator<Item = (ItemId, &Slot<Item>)> + '_ {
        self.entries.iter().map(|entry| (entry.id, &entry.slot))
    }

    pub fn slot_keys(&self) -> impl Iterator<Item = SlotKey> + '_ {
        self.entries.iter().map(|entry| SlotKey::Story(entry.id))
    }

    pub fn slot(&self, id: ItemId) -> Option<&Slot<Item>> {
        self.index.get(&id).map(|&i| &self.entries[i].slot)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn load_next_batch<F>(&mut self, fetcher: &mut F) -> BatchStart
    where
        F: ItemFetcher + ?Sized,
    {
        if self.state.pending > 0 {
            return BatchStart::Busy {
                pending: self.state.pending,
            };
        }

        let first = self.state.cursor;
        let end = first.saturating_add(self.state.batch_size).min(self.ids.len());
        if first >= end {
            return BatchStart::Exhausted;
        }

        let fresh: Vec<ItemId> = self.ids[first..end]
            .iter()
            .copied()
            .filter(|id| !self.index.contains_key(id))
            .collect();

        self.state.cursor = end;
        self.state.pending = fresh.len();

        for &id in &fresh {
            self.index.insert(id, self.entries.len());
            self.entries.push(Entry {
                id,
                slot: Slot::Loading,
                in_batch: true,
            });
        }
        info!(first, requested = fresh.len(), "loading batch");

        for id in &fresh {
            fetcher.fetch_item(*id);
        }

        BatchStart::Started {
            first,
            requested: fresh.len(),
        }
    }

    /// Records the outcome for `id`. A failure counts toward settlement the
    /// same as a success and leaves the slot in a retryable state.
    pub fn complete(&mut self, id: ItemId, outcome: Result<Item, FetchError>) -> Completion {
        let Some(&i) = self.index.get(&id) else {
            debug!(id, "no slot for completed item");
            return Completion::Ignored;
        };
        let entry = &mut self.entries[i];
        if !entry.slot.is_loading() {
            return Completion::Ignored;
        }

        if let Err(err) = &outcome {
            warn!(id, error = %err, "item fetch failed");
        }
        entry.slot = Slot::from(outcome);

        if !entry.in_batch {
            return Completion::Backfilled;
        }
        entry.in_batch = false;

        self.state.pending = self.state.pending.saturating_sub(1);
        if self.state.pending == 0 {
            info!(cursor = self.state.cursor, "batch settled");
            Completion::Settled
        } else {
            Completion::Pending {
                remaining: self.state.pending,
            }
        }
    }

    /// Re-requests a failed slot. Retries run outside of batch accounting.
    pub fn retry<F>(&mut self, id: ItemId, fetcher: &mut F) -> bool
    where
        F: ItemFetcher + ?Sized,
    {
        let Some(&i) = self.index.get(&id) else {
            return false;
        };
        let entry = &mut self.entries[i];
        if !matches!(entry.slot, Slot::Failed(_)) {
            return false;
        }

        entry.slot = Slot::Loading;
        debug!(id, "retrying item");
        fetcher.fetch_item(id);
        true
    }
}
