use chrono::{NaiveDate, NaiveDateTime};

use crate::model::*;

use super::EngineError;

// ── Slot generation ─────────────────────────────────────────────

/// A generated start time and whether it has already gone by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub time: TimeOfDay,
    pub is_past: bool,
}

/// Past-time policy. The current minute counts as past; every slot on an
/// earlier date is past, none on a later one.
pub fn is_past(date: NaiveDate, time: TimeOfDay, now: &NaiveDateTime) -> bool {
    let today = now.date();
    if date != today {
        return date < today;
    }
    time <= TimeOfDay::of(now)
}

/// Stride-spaced start times inside working hours, minus anything a break
/// touches (break bounds are inclusive), each flagged past or not.
pub fn candidate_times(
    hours: &WorkingHours,
    breaks: &[BreakWindow],
    stride_minutes: u32,
    date: NaiveDate,
    now: &NaiveDateTime,
) -> Result<Vec<Candidate>, EngineError> {
    if !hours.is_open {
        return Ok(Vec::new());
    }
    Ok(enumerate(hours.start, hours.end, stride_minutes)?
        .filter(|&t| !breaks.iter().any(|b| b.covers(t)))
        .map(|time| Candidate {
            time,
            is_past: is_past(date, time, now),
        })
        .collect())
}

/// Bookable start times for `date`, ascending.
pub fn generate_candidate_slots(
    hours: &WorkingHours,
    breaks: &[BreakWindow],
    stride_minutes: u32,
    date: NaiveDate,
    now: &NaiveDateTime,
) -> Result<Vec<TimeOfDay>, EngineError> {
    Ok(candidate_times(hours, breaks, stride_minutes, date, now)?
        .into_iter()
        .filter(|c| !c.is_past)
        .map(|c| c.time)
        .collect())
}
