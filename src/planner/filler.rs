//! Slot-filling loop
//!
//! Each pass recomputes the free slots from scratch, asks the proposer for
//! items to fill them, merges the additions, then reflects on just those
//! additions against the fill criteria. Terminates when no free slot remains
//! or when the pass/item ceilings force it forward.

use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::domain::{RenderOptions, ResearchFinding, ScheduleItem, TripProfile, render_schedule};
use crate::llm::Message;
use crate::progress::ProgressSink;
use crate::prompts::{FILL_CRITERIA, PromptRenderer, criteria_bullets, names};
use crate::proposer::{ContentProposer, ProposalRequest, propose_typed};
use crate::schedule::{ScheduleDelta, ScheduleStore, compute_free_slots, render_free_slots};

use super::{ActionList, CheckedActions, PlanError, checked_actions_tool, schedule_actions_tool};

const FILL_TOOL: &str = "submit_fill";
const REFLECTION_TOOL: &str = "submit_reflection";

/// Render findings the way the fill system prompt embeds them.
fn render_findings(findings: &[ResearchFinding]) -> String {
    findings
        .iter()
        .enumerate()
        .map(|(i, f)| {
            format!(
                "# {}.\n\nSearch Query: {}\n\nResult:\n{}",
                i + 1,
                f.query,
                f.result.replace("---", "")
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n\n")
}

pub(crate) struct SlotFiller<'a> {
    pub proposer: &'a dyn ContentProposer,
    pub prompts: &'a PromptRenderer,
    pub limits: &'a PlannerConfig,
    pub progress: &'a ProgressSink,
}

impl SlotFiller<'_> {
    pub async fn fill(
        &self,
        trip: &TripProfile,
        findings: &[ResearchFinding],
        store: &Mutex<ScheduleStore>,
    ) -> Result<(), PlanError> {
        let mut values = serde_json::Value::Object(trip.template_values());
        values["findings"] = serde_json::json!(render_findings(findings));
        let system = self.prompts.render(names::FILL_SYSTEM, &values)?;
        let criteria = criteria_bullets(&FILL_CRITERIA);
        let reflection_human = self.prompts.render(names::REFLECTION, &serde_json::json!({}))?;

        let mut pass = 1u32;
        loop {
            let (snapshot, len) = {
                let s = store.lock().await;
                (s.sorted(), s.len())
            };

            let slots = match compute_free_slots(&snapshot, trip.day_start, trip.day_end)? {
                Some(slots) => slots,
                None => {
                    self.progress.status("Completed filling all schedule items");
                    break;
                }
            };

            if pass > self.limits.max_fill_passes {
                warn!(pass, "fill: pass ceiling reached, moving on to validation");
                break;
            }
            if len >= self.limits.max_schedule_items {
                warn!(len, "fill: item ceiling reached, moving on to validation");
                break;
            }

            debug!(pass, slot_count = slots.len(), "fill: requesting items");
            self.progress.status("Filling schedule items");

            let fill_human = self.prompts.render(
                names::FILL,
                &serde_json::json!({
                    "schedule": render_schedule(&snapshot, RenderOptions::default()),
                    "slots": render_free_slots(&slots),
                    "criteria": criteria,
                }),
            )?;

            let response: ActionList = propose_typed(
                self.proposer,
                ProposalRequest {
                    system_prompt: system.clone(),
                    messages: vec![Message::user(fill_human.clone())],
                    tool: schedule_actions_tool(
                        FILL_TOOL,
                        "Submit schedule items for the empty slots. Leave each item id as 0; ids are assigned on merge.",
                    ),
                    max_tokens: self.limits.max_tokens,
                },
            )
            .await
            .map_err(PlanError::SlotFilling)?;

            // This step only adds: fresh ids continue past the current store.
            let mut added: Vec<ScheduleItem> = response.actions.into_iter().map(|a| a.schedule_item).collect();
            let mut next_id = len as u32 + 1;
            for item in &mut added {
                item.id = next_id;
                next_id += 1;
            }

            let delta = store.lock().await.apply(ScheduleDelta::Merge(added.clone()));
            self.progress.long(
                Some(format!("Added {} schedule items", delta.len())),
                format!("Added {} schedule items", delta.len()),
                render_schedule(&added, RenderOptions::default()),
            );
            self.progress.delta(&delta);

            // Reflection over just this pass's additions, not the whole
            // schedule: the critique prompt stays bounded as the schedule
            // grows.
            let reflection: CheckedActions = propose_typed(
                self.proposer,
                ProposalRequest {
                    system_prompt: system.clone(),
                    messages: vec![
                        Message::user(fill_human),
                        Message::assistant(render_schedule(&added, RenderOptions::full())),
                        Message::user(reflection_human.clone()),
                    ],
                    tool: checked_actions_tool(
                        REFLECTION_TOOL,
                        "Submit the criteria checks for the just-added items and any corrective actions.",
                        &FILL_CRITERIA,
                    ),
                    max_tokens: self.limits.max_tokens,
                },
            )
            .await
            .map_err(PlanError::SlotFilling)?;

            if reflection.actions.is_empty() {
                self.progress.status("All added schedule items verified");
            } else {
                self.progress
                    .status(format!("Found {} improvements in added schedule items", reflection.actions.len()));
                let corrections: Vec<ScheduleItem> = reflection.actions.into_iter().map(|a| a.schedule_item).collect();
                let delta = store.lock().await.apply(ScheduleDelta::Merge(corrections));
                self.progress.delta(&delta);
            }

            pass += 1;
        }

        Ok(())
    }
}
