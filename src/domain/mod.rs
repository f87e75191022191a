//! Domain types for trip planning
//!
//! These model the planning vocabulary: schedule items and their times,
//! the trip profile supplied by the caller, and research queries/findings.

mod item;
mod query;
pub mod timefmt;
mod trip;

pub use item::{ActivityType, ItemEnd, ItemTime, RenderOptions, ScheduleItem, TimeParseError, render_schedule};
pub use query::{ResearchFinding, ResearchQuery};
pub use trip::{Stage, TripProfile};
