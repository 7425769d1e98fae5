use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

use crate::engine::EngineError;
use crate::limits::*;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Minutes since midnight, `[0, 1440)`. Serialized as `"HH:MM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: TimeOfDay = TimeOfDay(0);

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self, EngineError> {
        if hour > 23 || minute > 59 {
            return Err(EngineError::InvalidFormat(format!("{hour}:{minute}")));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Strict `HH:MM` parse: two zero-padded digit pairs, nothing else.
    pub fn parse(s: &str) -> Result<Self, EngineError> {
        let b = s.as_bytes();
        let well_formed = b.len() == 5
            && b[2] == b':'
            && [0, 1, 3, 4].iter().all(|&i| b[i].is_ascii_digit());
        if !well_formed {
            return Err(EngineError::InvalidFormat(s.to_string()));
        }
        let digit = |i: usize| u16::from(b[i] - b'0');
        let hour = digit(0) * 10 + digit(1);
        let minute = digit(3) * 10 + digit(4);
        if hour > 23 || minute > 59 {
            return Err(EngineError::InvalidFormat(s.to_string()));
        }
        Ok(Self(hour * 60 + minute))
    }

    /// Wall-clock time of `now`, truncated to the minute.
    pub fn of(now: &NaiveDateTime) -> Self {
        Self((now.hour() * 60 + now.minute()) as u16)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Adds `n` minutes (may be negative), wrapping within one day.
    pub fn add_minutes(self, n: i64) -> Self {
        let m = (i64::from(self.0) + n).rem_euclid(i64::from(MINUTES_PER_DAY));
        Self(m as u16)
    }

    /// Signed minute delta from `self` to `later`.
    pub fn minutes_until(self, later: TimeOfDay) -> i64 {
        i64::from(later.0) - i64::from(self.0)
    }

    pub fn is_between_inclusive(self, lo: TimeOfDay, hi: TimeOfDay) -> bool {
        lo <= self && self <= hi
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Stride-spaced time points in `[start, end)`.
///
/// A point is produced only when a whole stride fits before `end`, so the
/// sequence has exactly `floor((end - start) / stride)` elements and an
/// inverted or too-short window is empty. A clone iterates independently
/// from the position it was taken at.
#[derive(Debug, Clone)]
pub struct Stride {
    next: u32,
    end: u32,
    step: u32,
}

impl Iterator for Stride {
    type Item = TimeOfDay;

    fn next(&mut self) -> Option<TimeOfDay> {
        if self.step > self.end.saturating_sub(self.next) {
            return None;
        }
        let t = TimeOfDay(self.next as u16);
        self.next = self.next.saturating_add(self.step);
        Some(t)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.end.saturating_sub(self.next) / self.step) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Stride {}

pub fn enumerate(start: TimeOfDay, end: TimeOfDay, stride_minutes: u32) -> Result<Stride, EngineError> {
    if stride_minutes == 0 {
        return Err(EngineError::InvalidConfig("slot stride must be positive".into()));
    }
    Ok(Stride {
        next: u32::from(start.0),
        end: u32::from(end.0),
        step: stride_minutes,
    })
}

// ── Service configuration ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkingHours {
    pub is_open: bool,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl WorkingHours {
    pub fn open(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { is_open: true, start, end }
    }

    pub fn closed() -> Self {
        Self {
            is_open: false,
            start: TimeOfDay::MIDNIGHT,
            end: TimeOfDay::MIDNIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakWindow {
    pub start: TimeOfDay,
    pub end: TimeOfDay,
    #[serde(default)]
    pub label: String,
}

impl BreakWindow {
    pub fn covers(&self, t: TimeOfDay) -> bool {
        t.is_between_inclusive(self.start, self.end)
    }
}

/// Everything the engine needs to know about one bookable service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    pub organization_id: Ulid,
    pub service_id: Ulid,
    pub working_hours: HashMap<Weekday, WorkingHours>,
    #[serde(default)]
    pub breaks: Vec<BreakWindow>,
    pub staff_count: u32,
    #[serde(default)]
    pub overbooking_limit: u32,
    pub average_service_time: u32,
    pub slot_duration: u32,
}

impl ServiceConfig {
    pub fn from_json(doc: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(doc)
            .map_err(|e| EngineError::InvalidConfig(format!("service document: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.staff_count == 0 {
            return Err(EngineError::InvalidConfig("staff count must be at least 1".into()));
        }
        if self.slot_duration == 0 {
            return Err(EngineError::InvalidConfig("slot duration must be positive".into()));
        }
        if self.average_service_time == 0 {
            return Err(EngineError::InvalidConfig(
                "average service time must be positive".into(),
            ));
        }
        if self.breaks.len() > MAX_BREAKS {
            return Err(EngineError::LimitExceeded("too many breaks"));
        }
        if let Some(b) = self.breaks.iter().find(|b| b.start >= b.end) {
            return Err(EngineError::InvalidConfig(format!(
                "break {:?} [{}, {}] must start before it ends",
                b.label, b.start, b.end
            )));
        }
        if self.staff_count.saturating_add(self.overbooking_limit) > MAX_CAPACITY_PER_SLOT {
            return Err(EngineError::LimitExceeded("slot capacity too large"));
        }
        Ok(())
    }

    pub fn max_capacity(&self) -> u32 {
        self.staff_count.saturating_add(self.overbooking_limit)
    }

    pub fn hours_for(&self, date: NaiveDate) -> Result<WorkingHours, EngineError> {
        let weekday = date.weekday();
        self.working_hours
            .get(&weekday)
            .copied()
            .ok_or_else(|| EngineError::InvalidConfig(format!("no working hours for {weekday}")))
    }

    pub fn slot_key(&self, date: NaiveDate, time: TimeOfDay) -> SlotKey {
        SlotKey { service_id: self.service_id, date, time }
    }
}

// ── Bookings ───────────────────────────────────────────────────

/// One specific slot instance: `(date, service, start time)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotKey {
    pub service_id: Ulid,
    pub date: NaiveDate,
    pub time: TimeOfDay,
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.service_id, self.date, self.time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Booked,
    Cancelled,
    NoShow,
    Completed,
}

impl BookingStatus {
    /// Whether a booking in this status occupies its slot.
    pub fn is_active(self) -> bool {
        !matches!(self, BookingStatus::Cancelled | BookingStatus::NoShow)
    }

    /// Only a live booking can move, and only to a terminal status.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (
                BookingStatus::Booked,
                BookingStatus::Cancelled | BookingStatus::NoShow | BookingStatus::Completed
            )
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Ulid,
    pub organization_id: Ulid,
    pub key: SlotKey,
    pub label: Option<String>,
    pub status: BookingStatus,
    pub created_at: NaiveDateTime,
}

impl Booking {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

// ── Query / admission results ───────────────────────────────────

/// A slot as shown to a customer. Built fresh per evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub time: TimeOfDay,
    /// Remaining admissions, never below zero.
    pub capacity: u32,
    /// How far existing bookings already exceed `max_capacity`.
    pub deficit: u32,
    pub bookings_count: u32,
    pub max_capacity: u32,
    pub is_available: bool,
    pub is_past: bool,
    pub estimated_wait_minutes: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rejection {
    SlotFull,
    InvalidSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Admission {
    Admitted(Ulid),
    Rejected(Rejection),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted(_))
    }

    pub fn booking_id(&self) -> Option<Ulid> {
        match self {
            Admission::Admitted(id) => Some(*id),
            Admission::Rejected(_) => None,
        }
    }
}
