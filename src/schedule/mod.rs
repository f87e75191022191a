//! Schedule state: the item store (merge reducer) and time-interval math

mod slots;
mod store;

pub use slots::{FreeSlot, SLOT_MINUTES, SlotError, compute_free_slots, render_free_slots, trip_free_hours};
pub use store::{ScheduleDelta, ScheduleStore};
