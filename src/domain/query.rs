//! Research queries and their findings

use serde::{Deserialize, Serialize};

/// One internet-research query, refined by the query loop before execution.
///
/// Ids are loop-local: the initial proposal gets 0..n-1 and additions take
/// `max(existing) + 1`. They never leak into the schedule item id space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchQuery {
    pub id: u32,
    pub rationale: String,
    #[serde(rename = "query")]
    pub content: String,
}

/// What a search returned for one finalized query.
///
/// `summary` is the condensed form used for progress reporting only; slot
/// filling always consumes the full `result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchFinding {
    pub query: String,
    pub result: String,
    #[serde(default)]
    pub summary: Option<String>,
}
