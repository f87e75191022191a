//! Transportation augmenter
//!
//! One-shot step bridging the terminals and the accommodation: research the
//! transit options, then ask the proposer for exactly two `transport` items
//! whose times absorb the travel duration around the fixed arrival and
//! departure instants. Anything other than two transport items is malformed
//! output.

use tracing::debug;

use crate::config::PlannerConfig;
use crate::domain::{ActivityType, ScheduleItem, TripProfile};
use crate::llm::Message;
use crate::progress::ProgressSink;
use crate::prompts::{PromptRenderer, names};
use crate::proposer::{ContentProposer, ProposalRequest, ProposerError, propose_typed};

use super::{ActionList, PlanError, schedule_actions_tool};

const TRANSIT_TOOL: &str = "submit_transit";

pub(crate) async fn plan_terminal_transit(
    search: &dyn crate::search::KnowledgeSearch,
    proposer: &dyn ContentProposer,
    prompts: &PromptRenderer,
    limits: &PlannerConfig,
    progress: &ProgressSink,
    trip: &TripProfile,
) -> Result<Vec<ScheduleItem>, PlanError> {
    debug!("plan_terminal_transit: called");
    progress.status("Adding terminal <-> accommodation schedules");

    let mut values = serde_json::Value::Object(trip.template_values());
    let search_prompt = prompts.render(names::TRANSPORT_SEARCH, &values)?;
    let options = search.search(&search_prompt).await.map_err(PlanError::TransportSearch)?;

    values["options"] = serde_json::json!(options);
    let fill_prompt = prompts.render(names::TRANSPORT_FILL, &values)?;

    let response: ActionList = propose_typed(
        proposer,
        ProposalRequest {
            system_prompt: "You are an AI tour planner.".to_string(),
            messages: vec![Message::user(fill_prompt)],
            tool: schedule_actions_tool(
                TRANSIT_TOOL,
                "Submit the two transport schedule items bridging terminal and accommodation. Set each item id to 0.",
            ),
            max_tokens: limits.max_tokens,
        },
    )
    .await
    .map_err(PlanError::Transport)?;

    let items: Vec<ScheduleItem> = response.actions.into_iter().map(|a| a.schedule_item).collect();

    if items.len() != 2 {
        return Err(PlanError::Transport(ProposerError::malformed(
            TRANSIT_TOOL,
            format!("expected exactly two transport items, got {}", items.len()),
        )));
    }
    if let Some(item) = items.iter().find(|i| i.activity_type != ActivityType::Transport) {
        return Err(PlanError::Transport(ProposerError::malformed(
            TRANSIT_TOOL,
            format!("item '{}' is not transport-typed", item.title),
        )));
    }

    debug!("plan_terminal_transit: done");
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::mock::MockProposer;
    use crate::search::mock::StaticSearch;
    use chrono::{NaiveDateTime, NaiveTime};

    fn trip() -> TripProfile {
        TripProfile {
            location: "Lyon".into(),
            accommodation: "Hotel Carlton".into(),
            arrival: NaiveDateTime::parse_from_str("2025-03-01 14:00", "%Y-%m-%d %H:%M").unwrap(),
            arrival_terminal: "Part-Dieu".into(),
            departure: NaiveDateTime::parse_from_str("2025-03-03 11:00", "%Y-%m-%d %H:%M").unwrap(),
            departure_terminal: "Airport".into(),
            budget: "mid-range".into(),
            theme: "Food".into(),
            interests: String::new(),
            extra_info: String::new(),
            day_start: NaiveTime::parse_from_str("08:00", "%H:%M").unwrap(),
            day_end: NaiveTime::parse_from_str("22:00", "%H:%M").unwrap(),
            fixed_schedules: vec![],
        }
    }

    fn transit_item(title: &str, start: &str, end: &str) -> serde_json::Value {
        serde_json::json!({
            "reasoning": "bridge the terminal",
            "schedule_item": {
                "id": 0,
                "activity_type": "transport",
                "time": {"start_time": start, "end_time": end},
                "location": "A to B",
                "title": title
            }
        })
    }

    #[tokio::test]
    async fn test_two_transport_items_pass_through() {
        let search = StaticSearch::new("Option 1: tram T3, 30 minutes, 3 EUR");
        let proposer = MockProposer::new().enqueue(
            TRANSIT_TOOL,
            serde_json::json!({"actions": [
                transit_item("Go to accommodation", "2025-03-01 14:00", "2025-03-01 14:30"),
                transit_item("Go to terminal", "2025-03-03 10:00", "2025-03-03 11:00"),
            ]}),
        );
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let items = plan_terminal_transit(&search, &proposer, &prompts, &limits, &progress, &trip())
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.activity_type == ActivityType::Transport));
        assert_eq!(search.call_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_count_is_malformed() {
        let search = StaticSearch::new("options");
        let proposer = MockProposer::new().enqueue(
            TRANSIT_TOOL,
            serde_json::json!({"actions": [
                transit_item("Go to accommodation", "2025-03-01 14:00", "2025-03-01 14:30"),
            ]}),
        );
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let err = plan_terminal_transit(&search, &proposer, &prompts, &limits, &progress, &trip())
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Transport(_)));
    }

    #[tokio::test]
    async fn test_wrong_type_is_malformed() {
        let search = StaticSearch::new("options");
        let mut wrong = transit_item("Go to accommodation", "2025-03-01 14:00", "2025-03-01 14:30");
        wrong["schedule_item"]["activity_type"] = serde_json::json!("meal");
        let proposer = MockProposer::new().enqueue(
            TRANSIT_TOOL,
            serde_json::json!({"actions": [
                wrong,
                transit_item("Go to terminal", "2025-03-03 10:00", "2025-03-03 11:00"),
            ]}),
        );
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let err = plan_terminal_transit(&search, &proposer, &prompts, &limits, &progress, &trip())
            .await
            .unwrap_err();
        assert!(matches!(err, PlanError::Transport(_)));
    }
}
