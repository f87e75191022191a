//! Planner error taxonomy
//!
//! Every failure names the phase it came from so a caller can tell a
//! free-slot precondition from a mid-research outage without parsing
//! messages.

use thiserror::Error;

use crate::domain::Stage;
use crate::prompts::PromptError;
use crate::proposer::ProposerError;
use crate::schedule::SlotError;
use crate::search::SearchError;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("free-slot computation failed: {0}")]
    Slots(#[from] SlotError),

    #[error("query refinement failed: {0}")]
    QueryRefinement(#[source] ProposerError),

    #[error("internet research failed: {0}")]
    Research(#[source] SearchError),

    #[error("transportation search failed: {0}")]
    TransportSearch(#[source] SearchError),

    #[error("transportation planning failed: {0}")]
    Transport(#[source] ProposerError),

    #[error("slot filling failed: {0}")]
    SlotFilling(#[source] ProposerError),

    #[error("schedule validation failed: {0}")]
    Validation(#[source] ProposerError),

    #[error("schedule validation did not converge after {passes} passes")]
    ValidationDidNotConverge { passes: u32 },

    #[error("invalid trip profile: {0}")]
    InvalidProfile(String),

    #[error("unsupported stage: {0}")]
    UnsupportedStage(Stage),

    #[error("prompt rendering failed: {0}")]
    Prompt(#[from] PromptError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_phase() {
        let err = PlanError::Slots(SlotError::EmptySchedule);
        assert!(err.to_string().starts_with("free-slot computation failed"));

        let err = PlanError::ValidationDidNotConverge { passes: 5 };
        assert_eq!(err.to_string(), "schedule validation did not converge after 5 passes");

        let err = PlanError::UnsupportedStage(Stage::Modify);
        assert_eq!(err.to_string(), "unsupported stage: modify");
    }
}
