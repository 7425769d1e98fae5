use chrono::{NaiveDate, NaiveDateTime};
use futures::future::try_join_all;

use crate::limits::*;
use crate::model::*;

use super::capacity::{CapacityRule, evaluate_availability};
use super::slots::{Candidate, candidate_times};
use super::{Engine, EngineError, read_with_retry};

/// Validated candidates for `date`, past ones included and flagged.
pub(super) fn day_candidates(
    service: &ServiceConfig,
    date: NaiveDate,
    now: &NaiveDateTime,
) -> Result<Vec<Candidate>, EngineError> {
    service.validate()?;
    let hours = service.hours_for(date)?;
    candidate_times(&hours, &service.breaks, service.slot_duration, date, now)
}

/// Every slot of the day with past ones flagged, from a bookings snapshot.
pub fn day_schedule(
    service: &ServiceConfig,
    date: NaiveDate,
    now: &NaiveDateTime,
    bookings: &[Booking],
) -> Result<Vec<Slot>, EngineError> {
    let candidates = day_candidates(service, date, now)?;
    Ok(evaluate_availability(&candidates, bookings, &CapacityRule::of(service)))
}

/// Slots a customer may still pick, from a bookings snapshot.
pub fn available_slots(
    service: &ServiceConfig,
    date: NaiveDate,
    now: &NaiveDateTime,
    bookings: &[Booking],
) -> Result<Vec<Slot>, EngineError> {
    let mut slots = day_schedule(service, date, now, bookings)?;
    slots.retain(|s| !s.is_past);
    Ok(slots)
}

impl Engine {
    async fn evaluate_day(
        &self,
        service: &ServiceConfig,
        date: NaiveDate,
        now: &NaiveDateTime,
    ) -> Result<Vec<Slot>, EngineError> {
        let candidates = day_candidates(service, date, now)?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let bookings = read_with_retry(&self.config, "bookings read", || {
            self.store
                .bookings_for_date(service.organization_id, service.service_id, date)
        })
        .await?;
        Ok(evaluate_availability(&candidates, &bookings, &CapacityRule::of(service)))
    }

    /// Customer-facing availability for one date. Read-only; may be stale by
    /// the time the customer commits.
    pub async fn list_available_slots(
        &self,
        service: &ServiceConfig,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<Slot>, EngineError> {
        metrics::counter!(crate::observability::SLOT_QUERIES_TOTAL, "view" => "available").increment(1);
        let mut slots = self.evaluate_day(service, date, &now).await?;
        slots.retain(|s| !s.is_past);
        Ok(slots)
    }

    /// Staff-facing view: like `list_available_slots` but past slots stay in,
    /// flagged `is_past`.
    pub async fn list_day_schedule(
        &self,
        service: &ServiceConfig,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Vec<Slot>, EngineError> {
        metrics::counter!(crate::observability::SLOT_QUERIES_TOTAL, "view" => "schedule").increment(1);
        self.evaluate_day(service, date, &now).await
    }

    /// Available slots for `days` consecutive dates starting at `from`,
    /// evaluated concurrently, returned in date order.
    pub async fn list_availability_range(
        &self,
        service: &ServiceConfig,
        from: NaiveDate,
        days: u32,
        now: NaiveDateTime,
    ) -> Result<Vec<(NaiveDate, Vec<Slot>)>, EngineError> {
        if days > MAX_RANGE_DAYS {
            return Err(EngineError::LimitExceeded("date range too wide"));
        }
        let dates = from.iter_days().take(days as usize);
        try_join_all(dates.map(|date| async move {
            let slots = self.list_available_slots(service, date, now).await?;
            Ok::<_, EngineError>((date, slots))
        }))
        .await
    }
}
