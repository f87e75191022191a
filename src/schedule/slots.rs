//! Time-interval math: free-slot computation and trip free-hours
//!
//! Free slots are recomputed from scratch on every slot-filling pass, never
//! maintained incrementally, so malformed proposals can't corrupt later
//! passes.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{ActivityType, ScheduleItem, TripProfile};

/// Slot granularity. Every free slot starts and ends on this grid.
pub const SLOT_MINUTES: i64 = 30;

/// Named precondition failures. The calculator never guesses a substitute
/// boundary; callers see exactly what was wrong.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("cannot compute free slots for an empty schedule")]
    EmptySchedule,
    #[error("first and last schedule items (by start time) must be terminals")]
    BoundaryNotTerminal,
}

/// A maximal contiguous free time range on the 30-minute grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreeSlot {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

fn round_up_to_slot(dt: NaiveDateTime) -> NaiveDateTime {
    let rem = dt.minute() as i64 % SLOT_MINUTES;
    if rem == 0 { dt } else { dt + Duration::minutes(SLOT_MINUTES - rem) }
}

/// Half-open interval overlap test. Zero-duration occupancies only block a
/// candidate that strictly contains their instant.
fn overlaps(a_start: NaiveDateTime, a_end: NaiveDateTime, b_start: NaiveDateTime, b_end: NaiveDateTime) -> bool {
    a_start < b_end && a_end > b_start
}

/// Is a candidate slot inside the daily active-hours window?
///
/// When the overall window crosses midnight, candidates on the far side have
/// an end hour numerically below `day_start`'s hour; adding 24 to it pushes
/// them past any same-day `day_end` so they are discarded.
fn within_day_window(slot_start: NaiveDateTime, slot_end: NaiveDateTime, day_start: NaiveTime, day_end: NaiveTime) -> bool {
    if slot_start.time() < day_start {
        return false;
    }

    let end = slot_end.time();
    let end_hour_adjusted = if end.hour() < day_start.hour() { end.hour() + 24 } else { end.hour() };

    (end_hour_adjusted, end.minute()) <= (day_end.hour(), day_end.minute())
}

/// Compute the free 30-minute-aligned slots between the first and last
/// scheduled item, restricted to the daily active-hours window.
///
/// Preconditions: the item list is non-empty and bounded by `terminal` items
/// (first and last by start time). Returns `Ok(None)` when no free slot
/// remains - the slot-filling loop's termination signal.
pub fn compute_free_slots(
    items: &[ScheduleItem],
    day_start: NaiveTime,
    day_end: NaiveTime,
) -> Result<Option<Vec<FreeSlot>>, SlotError> {
    if items.is_empty() {
        return Err(SlotError::EmptySchedule);
    }

    let mut sorted: Vec<&ScheduleItem> = items.iter().collect();
    sorted.sort_by_key(|item| item.time.start);

    let first = sorted.first().expect("non-empty");
    let last = sorted.last().expect("non-empty");
    if first.activity_type != ActivityType::Terminal || last.activity_type != ActivityType::Terminal {
        warn!(
            first = first.activity_type.as_str(),
            last = last.activity_type.as_str(),
            "compute_free_slots: schedule not bounded by terminals"
        );
        return Err(SlotError::BoundaryNotTerminal);
    }

    let occupied: Vec<(NaiveDateTime, NaiveDateTime)> = sorted
        .iter()
        .map(|item| (item.time.start, item.time.end_datetime()))
        .collect();

    let overall_start = round_up_to_slot(occupied.first().expect("non-empty").0);
    let overall_end = occupied.last().expect("non-empty").1;

    let step = Duration::minutes(SLOT_MINUTES);
    let mut free: Vec<FreeSlot> = Vec::new();
    let mut slot_start = overall_start;

    while slot_start + step <= overall_end {
        let slot_end = slot_start + step;

        if within_day_window(slot_start, slot_end, day_start, day_end) {
            let blocked = occupied.iter().any(|&(s, e)| overlaps(slot_start, slot_end, s, e));
            if !blocked {
                free.push(FreeSlot {
                    start: slot_start,
                    end: slot_end,
                });
            }
        }

        slot_start += step;
    }

    if free.is_empty() {
        debug!("compute_free_slots: no free slots remain");
        return Ok(None);
    }

    // Candidates come out in time order; fold contiguous ones into maximal runs.
    let mut merged: Vec<FreeSlot> = Vec::new();
    for slot in free {
        match merged.last_mut() {
            Some(last) if slot.start <= last.end => last.end = slot.end,
            _ => merged.push(slot),
        }
    }

    debug!(slot_count = merged.len(), "compute_free_slots: done");
    Ok(Some(merged))
}

/// Render merged slots grouped by calendar date, e.g.
/// `- 2025-03-01: 10:00 ~ 10:30, 11:00 ~ 12:00`
pub fn render_free_slots(slots: &[FreeSlot]) -> String {
    let mut by_date: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for slot in slots {
        by_date.entry(slot.start.date()).or_default().push(format!(
            "{} ~ {}",
            slot.start.format("%H:%M"),
            slot.end.format("%H:%M")
        ));
    }

    by_date
        .into_iter()
        .map(|(date, ranges)| format!("- {}: {}", date.format("%Y-%m-%d"), ranges.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Total free hours across the trip, used only to size the research-query
/// budget. Per day between arrival and departure inclusive: the active-hours
/// window clipped to the arrival/departure instants on boundary days, minus
/// the duration of fixed schedules starting inside that window.
pub fn trip_free_hours(trip: &TripProfile) -> f64 {
    let mut total_minutes: i64 = 0;
    let mut day = trip.arrival.date();

    while day <= trip.departure.date() {
        let mut window_start = day.and_time(trip.day_start);
        let mut window_end = day.and_time(trip.day_end);

        if day == trip.arrival.date() && trip.arrival > window_start {
            window_start = trip.arrival;
        }
        if day == trip.departure.date() && trip.departure < window_end {
            window_end = trip.departure;
        }

        if window_end > window_start {
            let mut minutes = (window_end - window_start).num_minutes();
            for item in &trip.fixed_schedules {
                let start = item.time.start;
                if start >= window_start && start < window_end {
                    minutes -= (item.time.end_datetime() - start).num_minutes();
                }
            }
            total_minutes += minutes.max(0);
        }

        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    let hours = total_minutes as f64 / 60.0;
    (hours * 100.0).round() / 100.0
}
