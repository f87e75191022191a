//! Research executor
//!
//! One search per finalized query, fanned out with bounded concurrency.
//! Findings are appended in completion order; nothing downstream may assume
//! query-id order. Each finding is also condensed into a short form for
//! progress reporting - informational only, never a substitute for the full
//! text.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::domain::{ResearchFinding, ResearchQuery, TripProfile};
use crate::progress::ProgressSink;
use crate::prompts::{PromptRenderer, names};
use crate::proposer::ContentProposer;
use crate::search::KnowledgeSearch;

use super::PlanError;

pub(crate) async fn run_research(
    search: &dyn KnowledgeSearch,
    proposer: &dyn ContentProposer,
    prompts: &PromptRenderer,
    limits: &PlannerConfig,
    progress: &ProgressSink,
    trip: &TripProfile,
    queries: &[ResearchQuery],
) -> Result<Vec<ResearchFinding>, PlanError> {
    debug!(query_count = queries.len(), "run_research: called");
    progress.status(format!("Starting {} internet searches in parallel", queries.len()));

    let results: Vec<Result<ResearchFinding, PlanError>> = futures::stream::iter(queries.iter().cloned())
        .map(|query| async move {
            let mut values = serde_json::Value::Object(trip.template_values());
            values["query"] = serde_json::json!(query.content);
            let prompt = prompts.render(names::SEARCH, &values)?;

            let result = search.search(&prompt).await.map_err(PlanError::Research)?;

            // Short form for the progress channel; a failed condensation
            // only costs the summary, never the finding.
            let summarize_prompt = prompts.render(names::SUMMARIZE, &serde_json::json!({"result": result}))?;
            let summary = match proposer.condense(&summarize_prompt, limits.max_tokens).await {
                Ok(text) => Some(text),
                Err(e) => {
                    warn!(query = %query.content, error = %e, "run_research: summarization failed");
                    None
                }
            };

            if let Some(short) = &summary {
                progress.long(
                    None,
                    "Internet search result",
                    format!("Query: {}\n\nSummarized result: {}", query.content, short),
                );
            }

            Ok(ResearchFinding {
                query: query.content,
                result,
                summary,
            })
        })
        .buffer_unordered(limits.max_concurrent_searches.max(1))
        .collect()
        .await;

    let mut findings = Vec::with_capacity(results.len());
    for result in results {
        findings.push(result?);
    }

    debug!(finding_count = findings.len(), "run_research: done");
    Ok(findings)
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

    fn queries(n: u32) -> Vec<ResearchQuery> {
        (0..n)
            .map(|i| ResearchQuery {
                id: i,
                rationale: "r".into(),
                content: format!("query {}", i),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_one_finding_per_query_with_summaries() {
        let search = StaticSearch::new("1. Les Halles de Lyon ...");
        let proposer = MockProposer::new();
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let findings = run_research(&search, &proposer, &prompts, &limits, &progress, &trip(), &queries(3))
            .await
            .unwrap();

        assert_eq!(findings.len(), 3);
        assert_eq!(search.call_count(), 3);
        for finding in &findings {
            assert_eq!(finding.result, "1. Les Halles de Lyon ...");
            assert_eq!(finding.summary.as_deref(), Some("condensed"));
        }
    }

    #[tokio::test]
    async fn test_no_queries_no_searches() {
        let search = StaticSearch::new("unused");
        let proposer = MockProposer::new();
        let prompts = PromptRenderer::new().unwrap();
        let limits = PlannerConfig::default();
        let progress = ProgressSink::disabled();

        let findings = run_research(&search, &proposer, &prompts, &limits, &progress, &trip(), &[])
            .await
            .unwrap();

        assert!(findings.is_empty());
        assert_eq!(search.call_count(), 0);
    }
}
