//! Schedule items - the unit everything in the planner trades in
//!
//! Items cross the proposer boundary as JSON, so the wire shape here is the
//! contract the structured-output tools are built against.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::timefmt::{DATETIME_FORMAT, TIME_FORMAT};

/// Error parsing a schedule time string
#[derive(Debug, Error)]
#[error("unable to parse time string: '{0}'")]
pub struct TimeParseError(pub String);

/// What kind of activity a schedule item is.
///
/// `Remove` is not a real activity: an incoming item with this type asks the
/// store to delete the item carrying the same id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Terminal,
    Transport,
    Walk,
    Meal,
    Event,
    Streets,
    MuseumGallery,
    HistoricalSite,
    Other,
    Remove,
}

impl ActivityType {
    /// Wire name, as it appears in rendered schedules and JSON
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Terminal => "terminal",
            Self::Transport => "transport",
            Self::Walk => "walk",
            Self::Meal => "meal",
            Self::Event => "event",
            Self::Streets => "streets",
            Self::MuseumGallery => "museum_gallery",
            Self::HistoricalSite => "historical_site",
            Self::Other => "other",
            Self::Remove => "remove",
        }
    }
}

/// End of a schedule item: either a full date-time or a bare time-of-day
/// interpreted as the same calendar day as the start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemEnd {
    DateTime(NaiveDateTime),
    TimeOfDay(NaiveTime),
}

/// When a schedule item happens. A missing end means a point-in-time event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawItemTime", into = "RawItemTime")]
pub struct ItemTime {
    pub start: NaiveDateTime,
    pub end: Option<ItemEnd>,
}

impl ItemTime {
    pub fn at(start: NaiveDateTime) -> Self {
        Self { start, end: None }
    }

    pub fn span(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self {
            start,
            end: Some(ItemEnd::DateTime(end)),
        }
    }

    /// Resolved end instant. A missing end collapses to the start
    /// (zero-duration occupancy); a bare time-of-day lands on the start's day.
    pub fn end_datetime(&self) -> NaiveDateTime {
        match self.end {
            None => self.start,
            Some(ItemEnd::DateTime(dt)) => dt,
            Some(ItemEnd::TimeOfDay(t)) => self.start.date().and_time(t),
        }
    }

    /// Render like `2025-03-01 14:00 ~ 15:30` (the `~ end` part only when set)
    pub fn render(&self) -> String {
        let mut s = self.start.format(DATETIME_FORMAT).to_string();
        match self.end {
            None => {}
            Some(ItemEnd::DateTime(dt)) => {
                s.push_str(" ~ ");
                s.push_str(&dt.format(DATETIME_FORMAT).to_string());
            }
            Some(ItemEnd::TimeOfDay(t)) => {
                s.push_str(" ~ ");
                s.push_str(&t.format(TIME_FORMAT).to_string());
            }
        }
        s
    }
}

/// Wire form of [`ItemTime`] - what the proposer actually emits
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawItemTime {
    start_time: String,
    #[serde(default)]
    end_time: Option<String>,
}

impl TryFrom<RawItemTime> for ItemTime {
    type Error = TimeParseError;

    fn try_from(raw: RawItemTime) -> Result<Self, Self::Error> {
        let start = NaiveDateTime::parse_from_str(raw.start_time.trim(), DATETIME_FORMAT)
            .map_err(|_| TimeParseError(raw.start_time.clone()))?;

        let end = match raw.end_time {
            None => None,
            Some(s) => {
                let trimmed = s.trim();
                if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, DATETIME_FORMAT) {
                    Some(ItemEnd::DateTime(dt))
                } else if let Ok(t) = NaiveTime::parse_from_str(trimmed, TIME_FORMAT) {
                    Some(ItemEnd::TimeOfDay(t))
                } else {
                    return Err(TimeParseError(s));
                }
            }
        };

        Ok(Self { start, end })
    }
}

impl From<ItemTime> for RawItemTime {
    fn from(time: ItemTime) -> Self {
        let end_time = match time.end {
            None => None,
            Some(ItemEnd::DateTime(dt)) => Some(dt.format(DATETIME_FORMAT).to_string()),
            Some(ItemEnd::TimeOfDay(t)) => Some(t.format(TIME_FORMAT).to_string()),
        };
        Self {
            start_time: time.start.format(DATETIME_FORMAT).to_string(),
            end_time,
        }
    }
}

/// A single planned occurrence in the schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: u32,
    pub activity_type: ActivityType,
    pub time: ItemTime,
    pub location: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
    /// Supplied by the user and immutable for every downstream step
    #[serde(default)]
    pub user_fixed: bool,
}

impl ScheduleItem {
    /// JSON schema for one item, embedded in the submit tools the proposer
    /// is forced to call. `user_fixed` is deliberately absent: the proposer
    /// never sets it.
    pub fn json_schema() -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "id": {
                    "type": "integer",
                    "description": "Item id. Use 0 for new items unless told otherwise."
                },
                "activity_type": {
                    "type": "string",
                    "enum": [
                        "terminal", "transport", "walk", "meal", "event", "streets",
                        "museum_gallery", "historical_site", "other", "remove"
                    ]
                },
                "time": {
                    "type": "object",
                    "properties": {
                        "start_time": {
                            "type": "string",
                            "description": "Full date and time, 'YYYY-MM-DD HH:MM'"
                        },
                        "end_time": {
                            "type": ["string", "null"],
                            "description": "'YYYY-MM-DD HH:MM' or 'HH:MM' (same day as start). Null for point events."
                        }
                    },
                    "required": ["start_time"]
                },
                "location": { "type": "string" },
                "title": { "type": "string" },
                "description": {
                    "type": ["string", "null"],
                    "description": "A brief description of the schedule."
                },
                "suggestion": {
                    "type": ["string", "null"],
                    "description": "Detailed suggestions or tips for the schedule."
                }
            },
            "required": ["id", "activity_type", "time", "location", "title"]
        })
    }
}

/// Which optional fields a schedule rendering includes
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    pub ids: bool,
    pub descriptions: bool,
    pub suggestions: bool,
}

impl RenderOptions {
    pub fn full() -> Self {
        Self {
            ids: true,
            descriptions: true,
            suggestions: true,
        }
    }
}

/// Render a schedule as the line-per-item text the proposer prompts embed.
///
/// Items are rendered in start-time order regardless of store order.
pub fn render_schedule(items: &[ScheduleItem], opts: RenderOptions) -> String {
    if items.is_empty() {
        return "No schedule items are arranged yet.".to_string();
    }

    let mut sorted: Vec<&ScheduleItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.time.start);

    let mut lines = Vec::with_capacity(sorted.len());
    for item in sorted {
        let mut line = if opts.ids {
            format!("- ID: {} | Time: {}", item.id, item.time.render())
        } else {
            format!("- Time: {}", item.time.render())
        };

        line.push_str(&format!(
            " | Type: {} | Title: {} | Location: {}",
            item.activity_type.as_str(),
            item.title,
            item.location
        ));

        if opts.descriptions
            && let Some(desc) = &item.description
        {
            line.push_str(&format!(" | Description: {}", desc));
        }
        if opts.suggestions
            && let Some(tip) = &item.suggestion
        {
            line.push_str(&format!(" | Suggestion: {}", tip));
        }

        lines.push(line);
    }

    lines.join("\n")
}
