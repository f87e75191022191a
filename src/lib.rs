//! wayplan - iterative travel-itinerary planning engine
//!
//! wayplan builds a multi-day itinerary by computing the free time between
//! fixed commitments, researching the destination through bounded
//! propose/critique loops, filling the calendar slot by slot, and running a
//! closing validation pass until the schedule satisfies the domain rules.
//!
//! # Core concepts
//!
//! - **Merge reducer**: the schedule store is only ever updated through
//!   by-id upsert/delete deltas ([`schedule::ScheduleDelta`]); every planning
//!   phase composes through it without knowing the full schedule shape.
//! - **Free slots from scratch**: every slot-filling pass recomputes the
//!   free slots from the current store, so a bad proposal can never corrupt
//!   later interval math.
//! - **Bounded loops**: query refinement and slot filling stop at their
//!   ceilings and move on; validation failing to converge is an error.
//! - **Injected collaborators**: the content proposer and knowledge search
//!   are traits handed to the planner at startup - no global model state.
//!
//! # Modules
//!
//! - [`domain`] - schedule items, trip profile, research types
//! - [`schedule`] - the item store and the time-interval calculator
//! - [`llm`] - provider clients and the fallback chain
//! - [`proposer`] - the structured-output boundary
//! - [`search`] - internet search capability
//! - [`planner`] - the phase loops and the orchestrator
//! - [`session`] - per-session keying and the stage router
//! - [`progress`] - the observational progress channel
//! - [`prompts`] - embedded prompt templates
//! - [`config`] - configuration types and loading

pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod planner;
pub mod progress;
pub mod prompts;
pub mod proposer;
pub mod schedule;
pub mod search;
pub mod session;

pub use config::{Config, LlmConfig, PlannerConfig, SearchConfig};
pub use domain::{ActivityType, ItemEnd, ItemTime, ResearchFinding, ResearchQuery, ScheduleItem, Stage, TripProfile};
pub use planner::{PlanError, Planner};
pub use progress::{ProgressEvent, ProgressSink};
pub use proposer::{ContentProposer, LlmProposer, ProposerError};
pub use schedule::{FreeSlot, ScheduleDelta, ScheduleStore, SlotError, compute_free_slots, trip_free_hours};
pub use search::{KnowledgeSearch, SearchError, SonarClient};
pub use session::SessionManager;
