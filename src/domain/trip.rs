//! Trip profile - the read-only constraints a planning run works under

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::item::{RenderOptions, ScheduleItem, render_schedule};
use super::timefmt;

/// Where a planning session is in its lifecycle.
///
/// `Modify` (re-planning after user edits) is a documented but unbuilt
/// transition; requesting it fails fast with an unsupported-stage error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    FirstGeneration,
    Modify,
    End,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::FirstGeneration => "first_generation",
            Stage::Modify => "modify",
            Stage::End => "end",
        };
        write!(f, "{}", s)
    }
}

/// Trip-level constraints, supplied once at orchestration start and read-only
/// afterwards. The fixed-schedule list seeds the item store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripProfile {
    /// Destination, e.g. "Lyon, France"
    pub location: String,
    /// Where the traveler sleeps
    pub accommodation: String,

    #[serde(with = "timefmt::datetime")]
    pub arrival: NaiveDateTime,
    pub arrival_terminal: String,

    #[serde(with = "timefmt::datetime")]
    pub departure: NaiveDateTime,
    pub departure_terminal: String,

    /// Budget tier, free text ("budget", "luxury", ...)
    pub budget: String,
    /// Trip theme, free text ("Cultural & Heritage", ...)
    pub theme: String,

    #[serde(default)]
    pub interests: String,
    #[serde(default)]
    pub extra_info: String,

    /// Daily active-hours window
    #[serde(with = "timefmt::time")]
    pub day_start: NaiveTime,
    #[serde(with = "timefmt::time")]
    pub day_end: NaiveTime,

    /// User-supplied commitments that must be preserved verbatim
    #[serde(default)]
    pub fixed_schedules: Vec<ScheduleItem>,
}

impl TripProfile {
    /// Key/value map handed to prompt templates. Callers merge in any
    /// step-specific keys before rendering.
    pub fn template_values(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        let mut put = |k: &str, v: String| {
            map.insert(k.to_string(), serde_json::Value::String(v));
        };

        put("location", self.location.clone());
        put("accommodation", self.accommodation.clone());
        put("arrival", self.arrival.format(timefmt::DATETIME_FORMAT).to_string());
        put("arrival_terminal", self.arrival_terminal.clone());
        put("departure", self.departure.format(timefmt::DATETIME_FORMAT).to_string());
        put("departure_terminal", self.departure_terminal.clone());
        put("budget", self.budget.clone());
        put("theme", self.theme.clone());
        put("interests", self.interests.clone());
        put("extra_info", self.extra_info.clone());
        put("day_start", self.day_start.format(timefmt::TIME_FORMAT).to_string());
        put("day_end", self.day_end.format(timefmt::TIME_FORMAT).to_string());
        put(
            "fixed_schedules",
            render_schedule(
                &self.fixed_schedules,
                RenderOptions {
                    ids: false,
                    descriptions: true,
                    suggestions: false,
                },
            ),
        );

        map
    }
}
