//! Full-schedule validator
//!
//! The closing loop: render the complete schedule with every field and id,
//! check it against the global criteria, and merge whatever corrective
//! actions come back until a pass returns none. Unlike the refinement and
//! filling ceilings, exhausting this loop's ceiling is a hard failure - a
//! schedule that never converges is not shipped.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::domain::{RenderOptions, ScheduleItem, render_schedule};
use crate::llm::Message;
use crate::progress::ProgressSink;
use crate::prompts::{PromptRenderer, VALIDATION_CRITERIA, criteria_bullets, names};
use crate::proposer::{ContentProposer, ProposalRequest, propose_typed};
use crate::schedule::{ScheduleDelta, ScheduleStore};

use super::{CheckedActions, PlanError, checked_actions_tool};

const VALIDATION_TOOL: &str = "submit_validation";

pub(crate) struct ScheduleValidator<'a> {
    pub proposer: &'a dyn ContentProposer,
    pub prompts: &'a PromptRenderer,
    pub limits: &'a PlannerConfig,
    pub progress: &'a ProgressSink,
}

impl ScheduleValidator<'_> {
    pub async fn validate(&self, store: &Mutex<ScheduleStore>) -> Result<(), PlanError> {
        let criteria = criteria_bullets(&VALIDATION_CRITERIA);

        for pass in 1..=self.limits.max_validation_passes {
            self.progress.status("Reviewing full schedule");

            let snapshot = store.lock().await.sorted();
            let prompt = self.prompts.render(
                names::VALIDATE,
                &serde_json::json!({
                    "criteria": criteria,
                    "schedule": render_schedule(&snapshot, RenderOptions::full()),
                }),
            )?;

            let verdict: CheckedActions = propose_typed(
                self.proposer,
                ProposalRequest {
                    system_prompt: "You are an AI tour planner.".to_string(),
                    messages: vec![Message::user(prompt)],
                    tool: checked_actions_tool(
                        VALIDATION_TOOL,
                        "Submit the criteria checks for the full schedule and any corrective actions.",
                        &VALIDATION_CRITERIA,
                    ),
                    max_tokens: self.limits.max_tokens,
                },
            )
            .await
            .map_err(PlanError::Validation)?;

            if verdict.actions.is_empty() {
                debug!(pass, "validate: schedule clean");
                self.progress.status("Schedule passed validation");
                return Ok(());
            }

            warn!(pass, action_count = verdict.actions.len(), "validate: applying corrections");
            self.progress
                .status(format!("Found {} improvements in final schedule", verdict.actions.len()));

            let corrections: Vec<ScheduleItem> = verdict.actions.into_iter().map(|a| a.schedule_item).collect();
            let delta = store.lock().await.apply(ScheduleDelta::Merge(corrections));
            self.progress.delta(&delta);
        }

        Err(PlanError::ValidationDidNotConverge {
            passes: self.limits.max_validation_passes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ActivityType, ItemTime};
    use crate::proposer::mock::MockProposer;
    use chrono::NaiveDateTime;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn seeded_store() -> Mutex<ScheduleStore> {
        let mut store = ScheduleStore::new();
        store.apply(ScheduleDelta::Merge(vec![ScheduleItem {
            id: 1,
            activity_type: ActivityType::Terminal,
            time: ItemTime::at(dt("2025-03-01 09:00")),
            location: "Part-Dieu".into(),
            title: "Arrive".into(),
            description: None,
            suggestion: None,
            user_fixed: false,
        }]));
        Mutex::new(store)
    }

    fn clean_verdict() -> serde_json::Value {
        serde_json::json!({
            "checks": [{"criterion": "meals", "reasoning": "three per day"}],
            "actions": []
        })
    }

    fn correction_verdict() -> serde_json::Value {
        serde_json::json!({
            "checks": [{"criterion": "meals", "reasoning": "missing dinner"}],
            "actions": [{
                "reasoning": "add the missing dinner",
                "schedule_item": {
                    "id": 9,
                    "activity_type": "meal",
                    "time": {"start_time": "2025-03-01 19:00", "end_time": "2025-03-01 20:00"},
                    "location": "Bouchon",
                    "title": "Dinner"
                }
            }]
        })
    }

    fn validator<'a>(
        proposer: &'a MockProposer,
        prompts: &'a PromptRenderer,
        limits: &'a PlannerConfig,
        progress: &'a ProgressSink,
    ) -> ScheduleValidator<'a> {
        ScheduleValidator {
            proposer,
            prompts,
            limits,
            progress,
        }
    }

    #[tokio::test]
    async fn test_clean_schedule_terminates_after_one_pass() {
        let store = seeded_store();
        let proposer = MockProposer::new().enqueue(VALIDATION_TOOL, clean_verdict());
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        validator(&proposer, &prompts, &limits, &progress)
            .validate(&store)
            .await
            .unwrap();

        assert_eq!(proposer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_corrections_applied_then_clean() {
        let store = seeded_store();
        let proposer = MockProposer::new()
            .enqueue(VALIDATION_TOOL, correction_verdict())
            .enqueue(VALIDATION_TOOL, clean_verdict());
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        validator(&proposer, &prompts, &limits, &progress)
            .validate(&store)
            .await
            .unwrap();

        assert_eq!(proposer.call_count(), 2);
        let store = store.lock().await;
        assert!(store.items().iter().any(|i| i.title == "Dinner"));
    }

    #[tokio::test]
    async fn test_never_converging_schedule_is_a_named_failure() {
        let store = seeded_store();
        let mut limits = PlannerConfig::default();
        limits.max_validation_passes = 2;

        let proposer = MockProposer::new()
            .enqueue(VALIDATION_TOOL, correction_verdict())
            .enqueue(VALIDATION_TOOL, correction_verdict());
        let prompts = PromptRenderer::new().unwrap();
        let progress = ProgressSink::disabled();

        let err = validator(&proposer, &prompts, &limits, &progress)
            .validate(&store)
            .await
            .unwrap_err();

        assert!(matches!(err, PlanError::ValidationDidNotConverge { passes: 2 }));
        assert_eq!(proposer.call_count(), 2);
    }
}
