//! Comment slots of the story shown in the detail panel.
//!
//! Opening a story creates one placeholder per child id right away and
//! requests every comment. Completions arrive in any order and fill their
//! own slot. Each open bumps a generation number so completions that belong
//! to a previously shown story are dropped.

use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::{Comment, ItemId, Slot, SlotKey};

pub trait CommentFetcher {
    fn fetch_comment(&mut self, generation: u64, id: ItemId);
}

#[derive(Debug, Clone, Default)]
pub struct CommentThread {
    generation: u64,
    order: Vec<ItemId>,
    slots: HashMap<ItemId, Slot<Comment>>,
    // Requests held back by the concurrency cap, oldest first
    queued: VecDeque<ItemId>,
    in_flight: usize,
    max_in_flight: Option<usize>,
}

impl CommentThread {
    /// `max_in_flight: None` requests every comment at once.
    pub fn new(max_in_flight: Option<usize>) -> Self {
        Self {
            max_in_flight: max_in_flight.map(|cap| cap.max(1)),
            ..Self::default()
        }
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn queued(&self) -> usize {
        self.queued.len()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Slots in child order.
    pub fn slots(&self) -> impl Iterator<Item = (SlotKey, &Slot<Comment>)> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id).map(|slot| (SlotKey::Comment(*id), slot)))
    }

    /// Replaces the current slots with placeholders for `child_ids` and
    /// starts fetching them. Returns the new generation.
    pub fn open<F>(&mut self, child_ids: &[ItemId], fetcher: &mut F) -> u64
    where
        F: CommentFetcher + ?Sized,
    {
        self.generation += 1;
        self.order.clear();
        self.slots.clear();
        self.queued.clear();
        self.in_flight = 0;

        for &id in child_ids {
            if self.slots.insert(id, Slot::Loading).is_none() {
                self.order.push(id);
                self.queued.push_back(id);
            }
        }
        debug!(generation = self.generation, count = self.order.len(), "opening comment thread");

        self.pump(fetcher);
        self.generation
    }

    /// Fills the slot for `id`. Returns `false` when the completion belongs
    /// to an older generation or no placeholder is waiting for it.
    pub fn complete<F>(
        &mut self,
        generation: u64,
        id: ItemId,
        outcome: Result<Comment, FetchError>,
        fetcher: &mut F,
    ) -> bool
    where
        F: CommentFetcher + ?Sized,
    {
        if generation != self.generation {
            return false;
        }
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        if !slot.is_loading() {
            return false;
        }

        if let Err(err) = &outcome {
            warn!(id, error = %err, "comment fetch failed");
        }
        *slot = Slot::from(outcome);
        self.in_flight = self.in_flight.saturating_sub(1);

        self.pump(fetcher);
        true
    }

    fn pump<F>(&mut self, fetcher: &mut F)
    where
        F: CommentFetcher + ?Sized,
    {
        while self.max_in_flight.map_or(true, |cap| self.in_flight < cap) {
            let Some(id) = self.queued.pop_front() else {
                break;
            };
            self.in_flight += 1;
            fetcher.fetch_comment(self.generation, id);
        }
    }
}
