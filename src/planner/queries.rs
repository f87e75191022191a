//! Query refinement loop
//!
//! Propose a query list sized by the trip's free hours, then critique it in
//! bounded passes. The critique's verdict is either "good enough" or a list
//! of atomic actions keyed by query id; the loop also terminates when the
//! query budget is reached or the pass ceiling hits (forced termination, not
//! an error).

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::domain::{ResearchQuery, TripProfile};
use crate::llm::{Message, ToolDefinition};
use crate::progress::ProgressSink;
use crate::prompts::{PromptRenderer, names};
use crate::proposer::{ContentProposer, ProposalRequest, ProposerError, propose_typed};

use super::PlanError;

const QUERIES_TOOL: &str = "submit_queries";
const REVIEW_TOOL: &str = "submit_query_review";

#[derive(Debug, Deserialize)]
struct ProposedQueries {
    queries: Vec<ProposedQuery>,
}

#[derive(Debug, Deserialize)]
struct ProposedQuery {
    rationale: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct QueryReview {
    #[serde(default)]
    actions: Vec<QueryAction>,
    good_enough: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct QueryAction {
    query_id: u32,
    #[serde(default)]
    rationale: String,
    #[serde(rename = "type")]
    kind: QueryActionKind,
    #[serde(default)]
    new_value: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum QueryActionKind {
    Add,
    Remove,
    Modify,
    Skip,
}

fn queries_tool() -> ToolDefinition {
    ToolDefinition::new(
        QUERIES_TOOL,
        "Submit the internet research queries. Call once with the full list.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "queries": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "rationale": {
                                "type": "string",
                                "description": "Think out loud why this query helps this specific trip."
                            },
                            "query": { "type": "string" }
                        },
                        "required": ["rationale", "query"]
                    }
                }
            },
            "required": ["queries"]
        }),
    )
}

fn review_tool() -> ToolDefinition {
    ToolDefinition::new(
        REVIEW_TOOL,
        "Submit the verdict on the current query list.",
        serde_json::json!({
            "type": "object",
            "properties": {
                "actions": {
                    "type": "array",
                    "description": "Leave empty when good_enough is true. 'new_value' is required for add and modify, ignored for remove and skip.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "query_id": { "type": "integer" },
                            "rationale": {
                                "type": "string",
                                "description": "Explain why you want to take this action."
                            },
                            "type": { "type": "string", "enum": ["add", "remove", "modify", "skip"] },
                            "new_value": { "type": ["string", "null"] }
                        },
                        "required": ["query_id", "rationale", "type"]
                    }
                },
                "good_enough": {
                    "type": "boolean",
                    "description": "True when the current queries need no further changes. Return this after the actions field."
                }
            },
            "required": ["actions", "good_enough"]
        }),
    )
}

/// Apply critique actions to the working query list.
///
/// `add` and `modify` without content are malformed, not ignorable: a
/// half-specified verdict must fail the loop.
fn apply_actions(queries: &mut Vec<ResearchQuery>, actions: Vec<QueryAction>) -> Result<(), ProposerError> {
    for action in actions {
        match action.kind {
            QueryActionKind::Add => {
                let content = action
                    .new_value
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ProposerError::malformed(REVIEW_TOOL, "add action without new_value"))?;
                let next_id = queries.iter().map(|q| q.id).max().unwrap_or(0) + 1;
                queries.push(ResearchQuery {
                    id: next_id,
                    rationale: action.rationale,
                    content,
                });
            }
            QueryActionKind::Remove => {
                queries.retain(|q| q.id != action.query_id);
            }
            QueryActionKind::Modify => {
                let content = action
                    .new_value
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| ProposerError::malformed(REVIEW_TOOL, "modify action without new_value"))?;
                if let Some(query) = queries.iter_mut().find(|q| q.id == action.query_id) {
                    query.content = content;
                }
            }
            QueryActionKind::Skip => {}
        }
    }
    Ok(())
}

pub(crate) struct QueryRefiner<'a> {
    pub proposer: &'a dyn ContentProposer,
    pub prompts: &'a PromptRenderer,
    pub limits: &'a PlannerConfig,
    pub progress: &'a ProgressSink,
}

impl QueryRefiner<'_> {
    /// Run the refinement loop and return the finalized queries, capped to
    /// the concurrent-search limit.
    pub async fn refine(&self, trip: &TripProfile, free_hours: f64) -> Result<Vec<ResearchQuery>, PlanError> {
        let target = (free_hours / self.limits.hours_per_query).ceil().max(0.0) as usize;
        debug!(free_hours, target, "refine: called");

        self.progress.status("Generating queries for internet search");

        let mut values = serde_json::Value::Object(trip.template_values());
        let system = self.prompts.render(names::QUERY_SYSTEM, &values)?;
        values["target"] = serde_json::json!(target);
        let init_human = self.prompts.render(names::QUERY_INIT, &values)?;

        let proposed: ProposedQueries = propose_typed(
            self.proposer,
            ProposalRequest {
                system_prompt: system.clone(),
                messages: vec![Message::user(init_human.clone())],
                tool: queries_tool(),
                max_tokens: self.limits.max_tokens,
            },
        )
        .await
        .map_err(PlanError::QueryRefinement)?;

        let mut queries: Vec<ResearchQuery> = proposed
            .queries
            .into_iter()
            .enumerate()
            .map(|(i, q)| ResearchQuery {
                id: i as u32,
                rationale: q.rationale,
                content: q.query,
            })
            .collect();

        self.progress.long(
            Some(format!("Generated {} queries", queries.len())),
            "Queries to look up on the internet",
            queries.iter().map(|q| format!("- {}", q.content)).collect::<Vec<_>>().join("\n"),
        );

        let mut transcript = vec![
            Message::user(init_human),
            Message::assistant(serde_json::to_string(&queries).unwrap_or_default()),
        ];
        let review_human = self.prompts.render(names::QUERY_REVIEW, &values)?;

        let mut iteration = 1u32;
        loop {
            if iteration >= self.limits.max_refine_passes {
                warn!(iteration, "refine: pass ceiling reached, moving on with current queries");
                break;
            }

            self.progress.status("Reviewing search queries for improvement");

            let mut messages = transcript.clone();
            messages.push(Message::user(review_human.clone()));

            let review: QueryReview = propose_typed(
                self.proposer,
                ProposalRequest {
                    system_prompt: system.clone(),
                    messages,
                    tool: review_tool(),
                    max_tokens: self.limits.max_tokens,
                },
            )
            .await
            .map_err(PlanError::QueryRefinement)?;

            if review.good_enough || queries.len() >= target {
                debug!(
                    good_enough = review.good_enough,
                    query_count = queries.len(),
                    "refine: terminating"
                );
                break;
            }

            self.progress.status(format!("Found {} improvements", review.actions.len()));
            let applied = serde_json::to_string(&review.actions).unwrap_or_default();
            apply_actions(&mut queries, review.actions).map_err(PlanError::QueryRefinement)?;

            transcript.push(Message::user(review_human.clone()));
            transcript.push(Message::assistant(applied));
            iteration += 1;
        }

        if queries.len() > self.limits.max_concurrent_searches {
            warn!(
                dropped = queries.len() - self.limits.max_concurrent_searches,
                "refine: more queries than the search cap, truncating"
            );
            queries.truncate(self.limits.max_concurrent_searches);
        }

        Ok(queries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposer::mock::MockProposer;
    use chrono::{NaiveDateTime, NaiveTime};

    fn trip() -> TripProfile {
        TripProfile {
            location: "Lyon".into(),
            accommodation: "Hotel".into(),
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

    fn query(id: u32, content: &str) -> ResearchQuery {
        ResearchQuery {
            id,
            rationale: "r".into(),
            content: content.into(),
        }
    }

    fn initial_queries() -> serde_json::Value {
        serde_json::json!({"queries": [{"rationale": "food", "query": "best bouchons in Lyon"}]})
    }

    fn skip_only_review() -> serde_json::Value {
        serde_json::json!({
            "actions": [{"query_id": 0, "rationale": "fine", "type": "skip"}],
            "good_enough": false
        })
    }

    #[tokio::test]
    async fn test_skip_only_reviews_terminate_via_ceiling() {
        let limits = PlannerConfig::default();
        let mut proposer = MockProposer::new().enqueue(QUERIES_TOOL, initial_queries());
        for _ in 1..limits.max_refine_passes {
            proposer = proposer.enqueue(REVIEW_TOOL, skip_only_review());
        }
        let prompts = PromptRenderer::new().unwrap();
        let progress = ProgressSink::disabled();

        let refiner = QueryRefiner {
            proposer: &proposer,
            prompts: &prompts,
            limits: &limits,
            progress: &progress,
        };

        // 60 free hours => target 10, never reached by a skip-only critique
        let queries = refiner.refine(&trip(), 60.0).await.unwrap();

        assert_eq!(queries.len(), 1);
        // One initial proposal + (max_refine_passes - 1) reviews, no more
        assert_eq!(proposer.call_count(), limits.max_refine_passes as usize);
    }

    #[tokio::test]
    async fn test_good_enough_short_circuits() {
        let proposer = MockProposer::new()
            .enqueue(QUERIES_TOOL, initial_queries())
            .enqueue(REVIEW_TOOL, serde_json::json!({"actions": [], "good_enough": true}));
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let refiner = QueryRefiner {
            proposer: &proposer,
            prompts: &prompts,
            limits: &limits,
            progress: &progress,
        };

        let queries = refiner.refine(&trip(), 60.0).await.unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(proposer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_target_reached_terminates_after_one_review() {
        let proposer = MockProposer::new()
            .enqueue(QUERIES_TOOL, initial_queries())
            .enqueue(REVIEW_TOOL, skip_only_review());
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let refiner = QueryRefiner {
            proposer: &proposer,
            prompts: &prompts,
            limits: &limits,
            progress: &progress,
        };

        // 6 free hours => target 1, already satisfied by the initial proposal
        let queries = refiner.refine(&trip(), 6.0).await.unwrap();
        assert_eq!(queries.len(), 1);
        assert_eq!(proposer.call_count(), 2);
    }

    #[tokio::test]
    async fn test_malformed_review_fails_the_run() {
        let proposer = MockProposer::new()
            .enqueue(QUERIES_TOOL, initial_queries())
            // Missing the mandatory good_enough verdict field
            .enqueue(REVIEW_TOOL, serde_json::json!({"actions": []}));
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let refiner = QueryRefiner {
            proposer: &proposer,
            prompts: &prompts,
            limits: &limits,
            progress: &progress,
        };

        let err = refiner.refine(&trip(), 60.0).await.unwrap_err();
        assert!(matches!(err, PlanError::QueryRefinement(_)));
    }

    #[test]
    fn test_apply_actions_add_remove_modify() {
        let mut queries = vec![query(0, "a"), query(1, "b"), query(4, "c")];

        apply_actions(
            &mut queries,
            vec![
                QueryAction {
                    query_id: 0,
                    rationale: "new angle".into(),
                    kind: QueryActionKind::Add,
                    new_value: Some("d".into()),
                },
                QueryAction {
                    query_id: 1,
                    rationale: String::new(),
                    kind: QueryActionKind::Remove,
                    new_value: None,
                },
                QueryAction {
                    query_id: 4,
                    rationale: String::new(),
                    kind: QueryActionKind::Modify,
                    new_value: Some("c, but sharper".into()),
                },
                QueryAction {
                    query_id: 0,
                    rationale: String::new(),
                    kind: QueryActionKind::Skip,
                    new_value: None,
                },
            ],
        )
        .unwrap();

        // Add takes max(existing) + 1 = 5
        assert_eq!(queries.iter().map(|q| q.id).collect::<Vec<_>>(), vec![0, 4, 5]);
        assert_eq!(queries[1].content, "c, but sharper");
        assert_eq!(queries[2].content, "d");
    }

    #[test]
    fn test_apply_actions_add_without_value_is_malformed() {
        let mut queries = vec![query(0, "a")];
        let result = apply_actions(
            &mut queries,
            vec![QueryAction {
                query_id: 0,
                rationale: String::new(),
                kind: QueryActionKind::Add,
                new_value: None,
            }],
        );
        assert!(matches!(result, Err(ProposerError::MalformedOutput { .. })));
    }
}
