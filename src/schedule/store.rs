//! The schedule item store and its merge reducer
//!
//! Every component that writes schedule state (fixed/terminal seeding,
//! transit augmentation, slot filling, validation) goes through
//! [`ScheduleStore::apply`]. The store owns its list exclusively; callers
//! submit deltas and read back the authoritative state.

use tracing::{debug, warn};

use crate::domain::{ActivityType, ScheduleItem};

/// A batch of changes for the store.
#[derive(Debug, Clone)]
pub enum ScheduleDelta {
    /// Clear the schedule entirely (session reset).
    Reset,
    /// By-id upsert/delete semantics, applied in list order:
    /// - id present + `remove` type: delete the existing item
    /// - id present otherwise: replace in place
    /// - id absent: append, unless the type is `remove` (no-op)
    Merge(Vec<ScheduleItem>),
}

/// Ordered, id-keyed collection of schedule items.
#[derive(Debug, Clone, Default)]
pub struct ScheduleStore {
    items: Vec<ScheduleItem>,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Id for the next item a generating step appends. Generating steps
    /// assign sequentially from here; ids of existing items are never reused.
    pub fn next_id(&self) -> u32 {
        self.items.len() as u32 + 1
    }

    /// Items in start-time order (store order is insertion/merge order).
    pub fn sorted(&self) -> Vec<ScheduleItem> {
        let mut items = self.items.clone();
        items.sort_by_key(|item| item.time.start);
        items
    }

    /// Apply a delta and return the items that were added or replaced, in
    /// application order. Deletions and no-ops contribute nothing to the
    /// returned list; callers forward it to the progress sink as-is.
    ///
    /// Items flagged `user_fixed` are immutable: an incoming replace or
    /// remove against one is dropped with a warning.
    pub fn apply(&mut self, delta: ScheduleDelta) -> Vec<ScheduleItem> {
        match delta {
            ScheduleDelta::Reset => {
                debug!(previous_len = self.items.len(), "apply: reset");
                self.items.clear();
                Vec::new()
            }
            ScheduleDelta::Merge(incoming) => {
                let mut changed = Vec::new();
                for item in incoming {
                    match self.items.iter().position(|existing| existing.id == item.id) {
                        Some(idx) => {
                            if self.items[idx].user_fixed {
                                warn!(id = item.id, "apply: ignoring update to user-fixed item");
                                continue;
                            }
                            if item.activity_type == ActivityType::Remove {
                                debug!(id = item.id, "apply: removing item");
                                self.items.remove(idx);
                            } else {
                                debug!(id = item.id, "apply: replacing item in place");
                                self.items[idx] = item.clone();
                                changed.push(item);
                            }
                        }
                        None => {
                            if item.activity_type == ActivityType::Remove {
                                // Concurrent proposals may legitimately target
                                // items already gone.
                                debug!(id = item.id, "apply: remove for unknown id, ignoring");
                                continue;
                            }
                            debug!(id = item.id, "apply: appending item");
                            self.items.push(item.clone());
                            changed.push(item);
                        }
                    }
                }
                changed
            }
        }
    }
}
