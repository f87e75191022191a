//! The planning engine
//!
//! Phases, in orchestration order: seeding (fixed + terminal items), the
//! transportation augmenter and query-refinement loop (concurrent), the
//! research fan-out, the slot-filling loop with reflection, and the
//! full-schedule validator. Each phase talks to the store only through the
//! merge reducer and reports failures under its own [`PlanError`] variant.

use serde::Deserialize;

use crate::domain::ScheduleItem;
use crate::llm::ToolDefinition;

mod error;
mod filler;
mod orchestrator;
mod queries;
mod research;
mod transport;
mod validator;

pub use error::PlanError;
pub use orchestrator::Planner;

/// Proposer response carrying schedule actions.
#[derive(Debug, Deserialize)]
pub(crate) struct ActionList {
    pub actions: Vec<ProposedAction>,
}

/// One proposed schedule change: reasoning first, then the item.
#[derive(Debug, Deserialize)]
pub(crate) struct ProposedAction {
    #[serde(default)]
    #[allow(dead_code)]
    pub reasoning: String,
    pub schedule_item: ScheduleItem,
}

/// One criterion the proposer reasoned about before deciding on actions.
#[derive(Debug, Deserialize)]
pub(crate) struct CriterionCheck {
    #[allow(dead_code)]
    pub criterion: String,
    #[allow(dead_code)]
    pub reasoning: String,
}

/// Response shape for the reflection and validation loops: ordered
/// criterion/reasoning pairs, then the corrective actions.
#[derive(Debug, Deserialize)]
pub(crate) struct CheckedActions {
    #[serde(default)]
    #[allow(dead_code)]
    pub checks: Vec<CriterionCheck>,
    pub actions: Vec<ProposedAction>,
}

const ACTION_ID_SEMANTICS: &str = "To REMOVE an existing item, return it with activity_type 'remove' and the target id. \
     To MODIFY an item, return the full new item with the same id. \
     To ADD a new item, use an id that matches no existing item and any activity_type except 'remove'.";

/// Submit tool for plain action lists (slot filling, transit items).
pub(crate) fn schedule_actions_tool(name: &str, description: &str) -> ToolDefinition {
    ToolDefinition::new(
        name,
        description,
        serde_json::json!({
            "type": "object",
            "properties": {
                "actions": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "reasoning": {
                                "type": "string",
                                "description": "Think out loud about this action before generating the item."
                            },
                            "schedule_item": ScheduleItem::json_schema(),
                        },
                        "required": ["reasoning", "schedule_item"]
                    }
                }
            },
            "required": ["actions"]
        }),
    )
}

/// Submit tool for the reflection/validation loops: criterion checks first,
/// then corrective actions (empty when every criterion is met).
pub(crate) fn checked_actions_tool(name: &str, description: &str, criteria: &[&str]) -> ToolDefinition {
    ToolDefinition::new(
        name,
        description,
        serde_json::json!({
            "type": "object",
            "properties": {
                "checks": {
                    "type": "array",
                    "description": format!(
                        "One entry per criterion, in the given order. The criteria are:\n{}",
                        crate::prompts::criteria_bullets(criteria)
                    ),
                    "items": {
                        "type": "object",
                        "properties": {
                            "criterion": { "type": "string" },
                            "reasoning": {
                                "type": "string",
                                "description": "Think out loud whether the schedule meets this criterion."
                            }
                        },
                        "required": ["criterion", "reasoning"]
                    }
                },
                "actions": {
                    "type": "array",
                    "description": format!(
                        "Return an empty list if all criteria are met. Otherwise: {}",
                        ACTION_ID_SEMANTICS
                    ),
                    "items": {
                        "type": "object",
                        "properties": {
                            "reasoning": { "type": "string" },
                            "schedule_item": ScheduleItem::json_schema(),
                        },
                        "required": ["reasoning", "schedule_item"]
                    }
                }
            },
            "required": ["checks", "actions"]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_list_requires_actions_field() {
        assert!(serde_json::from_value::<ActionList>(serde_json::json!({})).is_err());
        let ok = serde_json::from_value::<ActionList>(serde_json::json!({"actions": []})).unwrap();
        assert!(ok.actions.is_empty());
    }

    #[test]
    fn test_checked_actions_requires_actions_but_not_checks() {
        assert!(serde_json::from_value::<CheckedActions>(serde_json::json!({"checks": []})).is_err());
        let ok = serde_json::from_value::<CheckedActions>(serde_json::json!({"actions": []})).unwrap();
        assert!(ok.checks.is_empty());
    }

    #[test]
    fn test_tools_embed_item_schema() {
        let tool = schedule_actions_tool("submit_fill", "Fill the schedule");
        let item_schema = &tool.input_schema["properties"]["actions"]["items"]["properties"]["schedule_item"];
        assert!(
            item_schema["properties"]["activity_type"]["enum"]
                .as_array()
                .unwrap()
                .iter()
                .any(|v| v == "remove")
        );

        let tool = checked_actions_tool("submit_validation", "Validate", &crate::prompts::VALIDATION_CRITERIA);
        assert!(tool.input_schema["required"].as_array().unwrap().iter().any(|v| v == "checks"));
    }
}
