//! Embedded prompt templates
//!
//! Templates are compiled into the binary and rendered with handlebars
//! against the trip profile's key/value map plus step-specific keys. HTML
//! escaping is disabled - everything here is plain text for the model.

use handlebars::Handlebars;
use thiserror::Error;

/// Errors building or rendering prompt templates
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("template registration failed: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("template rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),
}

/// Template names accepted by [`PromptRenderer::render`]
pub mod names {
    pub const QUERY_SYSTEM: &str = "query_system";
    pub const QUERY_INIT: &str = "query_init";
    pub const QUERY_REVIEW: &str = "query_review";
    pub const SEARCH: &str = "search";
    pub const SUMMARIZE: &str = "summarize";
    pub const FILL_SYSTEM: &str = "fill_system";
    pub const FILL: &str = "fill";
    pub const REFLECTION: &str = "reflection";
    pub const TRANSPORT_SEARCH: &str = "transport_search";
    pub const TRANSPORT_FILL: &str = "transport_fill";
    pub const VALIDATE: &str = "validate";
}

/// Criteria the slot-filling reflection checks, in the order the proposer
/// must echo them back.
pub const FILL_CRITERIA: [&str; 7] = [
    "Fill in events in order, starting with the earliest empty time slot.",
    "Consider travel time between locations, and add the travel as its own event using the 'transport' or 'walk' type.",
    "Prioritize activities that are the most relevant to the user and do not overlap with the current schedule.",
    "Include as much detail as possible in the 'description' and 'suggestion' fields.",
    "Ensure meal times (breakfast, lunch, dinner, snack) are accounted for and spaced appropriately through the day.",
    "Come back to the accommodation at the end of every day.",
    "Leave enough time to reach the departure terminal; no big events right before departure.",
];

/// Criteria the full-schedule validator checks.
pub const VALIDATION_CRITERIA: [&str; 4] = [
    "There are at least 3 meals per day, unless user-provided schedules overlap the meal time, or it is the arrival or departure day and the meal time falls before arrival or after departure.",
    "There are proper transportation items between consecutive activities at different locations.",
    "The traveler starts from and returns to the accommodation every day except the arrival and departure days.",
    "There are no duplicated schedule items.",
];

/// Render a criteria list as the bullet block prompts embed.
pub fn criteria_bullets(criteria: &[&str]) -> String {
    criteria.iter().map(|c| format!("- {}", c)).collect::<Vec<_>>().join("\n")
}

const QUERY_SYSTEM_T: &str = "\
You are an AI tour planner conducting internet research to gather travel options tailored to the user's preferences and trip information.

The user will be visiting {{location}}, staying at {{accommodation}}, from {{arrival}} to {{departure}}. They prefer a {{budget}} trip with a focus on {{theme}} and are particularly interested in {{interests}}. Their day starts at {{day_start}} and ends at {{day_end}}.

Fixed schedules the user has to follow:
{{fixed_schedules}}

Extra information about the user:
{{extra_info}}

Guidelines:
- Each query must cover a distinct aspect of the trip; no overlap between queries.
- Do not include the trip dates or times in the queries themselves.
- Do not generate queries about transportation between the terminal and the accommodation; that is handled separately.";

const QUERY_INIT_T: &str = "\
Read my trip information carefully and generate up to {{target}} queries to look up information on the internet. Make sure the queries do not overlap with each other.";

const QUERY_REVIEW_T: &str = "\
Review the queries for quality. Ensure they are diverse and not redundant; if any are redundant, keep only the best one. Add new queries if key aspects of my trip are missing. Modify queries that are too vague to make them specific to my trip. For queries that already meet the bar, use a 'skip' action. If the whole list is good enough, set good_enough to true.";

const SEARCH_T: &str = "\
You are an AI tour planner doing research for the user.

The user will be visiting {{location}}, staying at {{accommodation}}, from {{arrival}} to {{departure}}. They prefer a {{budget}} trip and plan to start their day at {{day_start}} and end it at {{day_end}}.

Collect information about the following query:
{{query}}

Rules:
- Keep the user's trip information in mind and put the most relevant results first.
- Do not plan the full schedule; just collect information about the query.
- Only include options available between {{arrival}} and {{departure}}.
- Where possible, include practical tips: signature dishes, best photo spots, cheaper or easier tickets, times to avoid crowds, local etiquette, transportation hints, common tourist traps, souvenirs worth looking for.
- Do not include citations.
- Do not use Markdown. Plain text with bullet points and numbered lists only.";

const SUMMARIZE_T: &str = "\
Summarize the following internet search result in a single paragraph. If it lists tourist attractions, places of interest, or landmarks, keep all of them in the summary.

{{result}}";

const FILL_SYSTEM_T: &str = "\
You are an AI tour planner arranging a travel schedule from research collected earlier.

The user will be visiting {{location}}, staying at {{accommodation}}, from {{arrival}} to {{departure}}. They prefer a {{budget}} trip with a focus on {{theme}} and are particularly interested in {{interests}}. Their day starts at {{day_start}} and ends at {{day_end}}.

Extra information about the user:
{{extra_info}}

Research collected from the internet:

{{findings}}";

const FILL_T: &str = "\
Fill the schedule with the best schedule items for the empty slots. You do not need to fill everything at once; you will be asked again until all slots are filled.

Current schedule:
{{schedule}}

Empty slots:
{{slots}}

Important rules:
{{criteria}}";

const REFLECTION_T: &str = "\
Verify that the schedule items you just returned meet the provided criteria. Focus only on the items within your current scope, not the entire schedule. For example, if you returned schedules from 15:00 to 17:00 on one day, only evaluate that timeframe.";

const TRANSPORT_SEARCH_T: &str = "\
You are an AI tour planner finding transportation between the terminals and the accommodation.

Accommodation: {{accommodation}} ({{location}}).
Arrival: {{arrival}}, {{arrival_terminal}}.
Departure: {{departure}}, {{departure_terminal}}.

Find the shortest practical route in each direction. Consider public transportation, taxis or ride-hailing, car rental, and walking; assume the user has big luggage to carry the whole way. Pick the best one or two options for each direction and describe the transportation type, duration, and price in detail.";

const TRANSPORT_FILL_T: &str = "\
{{options}}

---

Using the information above, create exactly two 'transport' schedule items: one for arrival and one for departure.

- For the location field use the 'A to B' format, where A and B are addresses or place names.
- Title them 'Go to accommodation' and 'Go to terminal'.
- Arrival is at {{arrival}} and departure is at {{departure}}. Account for the travel time in both start_time and end_time: the arrival leg starts at the arrival time and ends after the travel duration; the departure leg ends at the departure time and starts early enough to make it.
- Put the route details in description, and the cost in suggestion if known.";

const VALIDATE_T: &str = "\
You are an AI tour planner who just finished filling a schedule. Check whether the schedule meets the provided criteria, and return corrective actions if it does not.

Criteria:
{{criteria}}

Here is the full schedule:
{{schedule}}";

/// Registry of embedded templates
pub struct PromptRenderer {
    registry: Handlebars<'static>,
}

impl PromptRenderer {
    pub fn new() -> Result<Self, PromptError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        registry.register_template_string(names::QUERY_SYSTEM, QUERY_SYSTEM_T)?;
        registry.register_template_string(names::QUERY_INIT, QUERY_INIT_T)?;
        registry.register_template_string(names::QUERY_REVIEW, QUERY_REVIEW_T)?;
        registry.register_template_string(names::SEARCH, SEARCH_T)?;
        registry.register_template_string(names::SUMMARIZE, SUMMARIZE_T)?;
        registry.register_template_string(names::FILL_SYSTEM, FILL_SYSTEM_T)?;
        registry.register_template_string(names::FILL, FILL_T)?;
        registry.register_template_string(names::REFLECTION, REFLECTION_T)?;
        registry.register_template_string(names::TRANSPORT_SEARCH, TRANSPORT_SEARCH_T)?;
        registry.register_template_string(names::TRANSPORT_FILL, TRANSPORT_FILL_T)?;
        registry.register_template_string(names::VALIDATE, VALIDATE_T)?;

        Ok(Self { registry })
    }

    pub fn render(&self, name: &str, values: &serde_json::Value) -> Result<String, PromptError> {
        Ok(self.registry.render(name, values)?)
    }
}
