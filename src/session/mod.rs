//! Per-session planning state
//!
//! Every run is addressed by an opaque session id; sessions never share
//! state. The stage router decides what a `plan` call does: generate, refuse
//! (the unbuilt `modify` path), or return the existing schedule unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::domain::{ScheduleItem, Stage, TripProfile};
use crate::planner::{PlanError, Planner};
use crate::progress::ProgressSink;
use crate::schedule::{ScheduleDelta, ScheduleStore};

struct Session {
    stage: Stage,
    store: Arc<Mutex<ScheduleStore>>,
}

impl Session {
    fn new() -> Self {
        Self {
            stage: Stage::FirstGeneration,
            store: Arc::new(Mutex::new(ScheduleStore::new())),
        }
    }
}

/// Keys planning runs by session id and routes on the session's stage.
pub struct SessionManager {
    planner: Arc<Planner>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionManager {
    pub fn new(planner: Arc<Planner>) -> Self {
        Self {
            planner,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Fresh opaque session id for callers that don't bring their own.
    pub fn generate_session_id() -> String {
        uuid::Uuid::now_v7().to_string()
    }

    /// Run the stage router for this session.
    ///
    /// `first_generation` runs a full generation and moves the session to
    /// `end`; `end` returns the existing schedule unchanged; `modify` is the
    /// documented unbuilt re-planning path and fails fast.
    pub async fn plan(
        &self,
        session_id: &str,
        trip: &TripProfile,
        progress: &ProgressSink,
    ) -> Result<Vec<ScheduleItem>, PlanError> {
        let (stage, store) = {
            let mut sessions = self.sessions.lock().await;
            let session = sessions.entry(session_id.to_string()).or_insert_with(Session::new);
            (session.stage, session.store.clone())
        };

        match stage {
            Stage::FirstGeneration => {
                info!(session_id, "plan: starting first generation");
                let items = self.planner.generate(trip, &store, progress).await?;

                let mut sessions = self.sessions.lock().await;
                if let Some(session) = sessions.get_mut(session_id)
                    && Arc::ptr_eq(&session.store, &store)
                {
                    session.stage = Stage::End;
                }
                Ok(items)
            }
            Stage::Modify => Err(PlanError::UnsupportedStage(Stage::Modify)),
            Stage::End => Ok(store.lock().await.sorted()),
        }
    }

    /// Re-planning after user edits is a named, not-yet-supported
    /// transition.
    pub fn request_replan(&self, _session_id: &str) -> Result<(), PlanError> {
        Err(PlanError::UnsupportedStage(Stage::Modify))
    }

    /// Reset a session: clear its schedule through the reducer and swap in a
    /// fresh store. Tasks still running against the old store keep writing
    /// to it, and those results are thereby discarded - cancellation is
    /// logical, not preemptive.
    pub async fn reset(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(session_id) {
            session.store.lock().await.apply(ScheduleDelta::Reset);
            session.store = Arc::new(Mutex::new(ScheduleStore::new()));
            session.stage = Stage::FirstGeneration;
            info!(session_id, "reset: session cleared");
        }
    }

    /// Current schedule for a session, sorted by start time.
    pub async fn schedule(&self, session_id: &str) -> Vec<ScheduleItem> {
        let store = {
            let sessions = self.sessions.lock().await;
            sessions.get(session_id).map(|s| s.store.clone())
        };
        match store {
            Some(store) => store.lock().await.sorted(),
            None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::proposer::mock::MockProposer;
    use crate::search::mock::StaticSearch;

    fn manager() -> SessionManager {
        let planner = Planner::new(
            Arc::new(MockProposer::new()),
            Arc::new(StaticSearch::new("finding")),
            PlannerConfig::default(),
        )
        .unwrap();
        SessionManager::new(Arc::new(planner))
    }

    #[tokio::test]
    async fn test_request_replan_fails_fast() {
        let manager = manager();
        let err = manager.request_replan("s1").unwrap_err();
        assert!(matches!(err, PlanError::UnsupportedStage(Stage::Modify)));
    }

    #[tokio::test]
    async fn test_unknown_session_schedule_is_empty() {
        let manager = manager();
        assert!(manager.schedule("nope").await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_unknown_session_is_a_noop() {
        let manager = manager();
        manager.reset("nope").await;
        assert!(manager.schedule("nope").await.is_empty());
    }

    #[test]
    fn test_generated_session_ids_are_unique() {
        assert_ne!(SessionManager::generate_session_id(), SessionManager::generate_session_id());
    }
}
