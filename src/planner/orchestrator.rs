//! Planning orchestrator
//!
//! Sequences one generation run: free-hours sizing and seeding, then the
//! transportation augmenter and query refinement concurrently (neither reads
//! the other's output), then research, slot filling, and the closing
//! validation pass. The store is the only shared mutable state; branches
//! compute their proposals concurrently and serialize through its mutex only
//! to merge.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::config::PlannerConfig;
use crate::domain::{ActivityType, ItemTime, ScheduleItem, TripProfile};
use crate::progress::ProgressSink;
use crate::prompts::{PromptError, PromptRenderer};
use crate::proposer::ContentProposer;
use crate::schedule::{ScheduleDelta, ScheduleStore, trip_free_hours};
use crate::search::KnowledgeSearch;

use super::filler::SlotFiller;
use super::queries::QueryRefiner;
use super::research::run_research;
use super::transport::plan_terminal_transit;
use super::validator::ScheduleValidator;
use super::PlanError;

/// The planning engine. Built once per process with its collaborators
/// injected; each run works against a caller-supplied per-session store.
pub struct Planner {
    proposer: Arc<dyn ContentProposer>,
    search: Arc<dyn KnowledgeSearch>,
    prompts: PromptRenderer,
    limits: PlannerConfig,
}

impl Planner {
    pub fn new(
        proposer: Arc<dyn ContentProposer>,
        search: Arc<dyn KnowledgeSearch>,
        limits: PlannerConfig,
    ) -> Result<Self, PromptError> {
        Ok(Self {
            proposer,
            search,
            prompts: PromptRenderer::new()?,
            limits,
        })
    }

    /// Run one full schedule generation against the given store.
    pub async fn generate(
        &self,
        trip: &TripProfile,
        store: &Arc<Mutex<ScheduleStore>>,
        progress: &ProgressSink,
    ) -> Result<Vec<ScheduleItem>, PlanError> {
        let free_hours = trip_free_hours(trip);
        info!(free_hours, location = %trip.location, "generate: starting");
        progress.status(format!("Calculated free hours: {}", free_hours));

        self.seed_fixed_schedules(trip, store, progress).await?;
        self.seed_terminal_schedules(trip, store, progress).await;

        // Rendezvous: seeding is complete before either branch below runs.
        let transit_branch = async {
            let mut items =
                plan_terminal_transit(self.search.as_ref(), self.proposer.as_ref(), &self.prompts, &self.limits, progress, trip)
                    .await?;
            let delta = {
                let mut s = store.lock().await;
                let mut next_id = s.next_id();
                for item in &mut items {
                    item.id = next_id;
                    next_id += 1;
                }
                s.apply(ScheduleDelta::Merge(items))
            };
            progress.delta(&delta);
            Ok::<(), PlanError>(())
        };

        let refiner = QueryRefiner {
            proposer: self.proposer.as_ref(),
            prompts: &self.prompts,
            limits: &self.limits,
            progress,
        };
        let refine_branch = refiner.refine(trip, free_hours);

        let (transit_result, queries) = tokio::join!(transit_branch, refine_branch);
        transit_result?;
        let queries = queries?;

        let findings = run_research(
            self.search.as_ref(),
            self.proposer.as_ref(),
            &self.prompts,
            &self.limits,
            progress,
            trip,
            &queries,
        )
        .await?;

        SlotFiller {
            proposer: self.proposer.as_ref(),
            prompts: &self.prompts,
            limits: &self.limits,
            progress,
        }
        .fill(trip, &findings, store)
        .await?;

        ScheduleValidator {
            proposer: self.proposer.as_ref(),
            prompts: &self.prompts,
            limits: &self.limits,
            progress,
        }
        .validate(store)
        .await?;

        info!("generate: complete");
        progress.status("Schedule generation complete");

        Ok(store.lock().await.sorted())
    }

    /// Seed the user's fixed commitments, tagged immutable.
    async fn seed_fixed_schedules(
        &self,
        trip: &TripProfile,
        store: &Arc<Mutex<ScheduleStore>>,
        progress: &ProgressSink,
    ) -> Result<(), PlanError> {
        if trip.fixed_schedules.is_empty() {
            return Ok(());
        }
        progress.status("Adding fixed schedules");

        let mut seen = HashSet::new();
        for item in &trip.fixed_schedules {
            if !seen.insert(item.id) {
                return Err(PlanError::InvalidProfile(format!("duplicate fixed schedule id {}", item.id)));
            }
            if item.activity_type == ActivityType::Remove {
                return Err(PlanError::InvalidProfile(format!(
                    "fixed schedule {} has the reserved 'remove' type",
                    item.id
                )));
            }
        }

        let items: Vec<ScheduleItem> = trip
            .fixed_schedules
            .iter()
            .cloned()
            .map(|mut item| {
                item.user_fixed = true;
                item
            })
            .collect();

        let delta = store.lock().await.apply(ScheduleDelta::Merge(items));
        progress.delta(&delta);
        Ok(())
    }

    /// Seed the arrival and departure terminal items that bound the trip.
    async fn seed_terminal_schedules(&self, trip: &TripProfile, store: &Arc<Mutex<ScheduleStore>>, progress: &ProgressSink) {
        progress.status("Adding terminal schedules");

        let delta = {
            let mut s = store.lock().await;
            let base = s.next_id();
            s.apply(ScheduleDelta::Merge(vec![
                ScheduleItem {
                    id: base,
                    activity_type: ActivityType::Terminal,
                    time: ItemTime::at(trip.arrival),
                    location: trip.arrival_terminal.clone(),
                    title: format!("Arrive at {}", trip.arrival_terminal),
                    description: None,
                    suggestion: None,
                    user_fixed: false,
                },
                ScheduleItem {
                    id: base + 1,
                    activity_type: ActivityType::Terminal,
                    time: ItemTime::at(trip.departure),
                    location: trip.departure_terminal.clone(),
                    title: format!("Depart from {}", trip.departure_terminal),
                    description: None,
                    suggestion: None,
                    user_fixed: false,
                },
            ]))
        };
        progress.delta(&delta);
    }
}
