use std::time::Instant;

use tracing::{debug, warn};
use ulid::Ulid;

use crate::config::EngineConfig;
use crate::limits::*;
use crate::model::*;
use crate::observability::{LOCK_WAIT_SECONDS, RESERVATIONS_TOTAL, RESERVE_DURATION_SECONDS, outcome_label};

use super::queries::day_candidates;
use super::store::BookingStore;
use super::{Engine, EngineError, read_with_retry};

/// Count-then-insert for one slot key. The caller holds the key's lock.
async fn admit(
    store: &dyn BookingStore,
    config: &EngineConfig,
    booking: Booking,
    max_capacity: u32,
) -> Result<Admission, EngineError> {
    let key = booking.key;
    let occupancy = read_with_retry(config, "occupancy read", || store.occupancy(&key)).await?;
    if occupancy >= max_capacity {
        debug!("slot {key} full ({occupancy}/{max_capacity})");
        return Ok(Admission::Rejected(Rejection::SlotFull));
    }

    // Never retried: a failed insert may still have landed.
    let id = booking.id;
    if let Err(e) = store.insert_booking(booking).await {
        warn!("insert into {key} failed, outcome unknown: {e}");
        return Err(EngineError::AllocationFailed { key, reason: e.to_string() });
    }
    debug!("admitted {id} into {key} ({}/{max_capacity})", occupancy + 1);
    Ok(Admission::Admitted(id))
}

impl Engine {
    /// Atomically admit one booking into `key` unless `max_capacity` active
    /// bookings already occupy it.
    ///
    /// Waiting for the slot lock is bounded by `EngineConfig::lock_wait` and
    /// may be cancelled freely. Once the lock is held the count and insert
    /// run on their own task and finish even if this future is dropped.
    pub async fn try_reserve(
        &self,
        key: SlotKey,
        organization_id: Ulid,
        max_capacity: u32,
        label: Option<String>,
    ) -> Result<Admission, EngineError> {
        if let Some(ref l) = label
            && l.len() > MAX_LABEL_LEN {
                return Err(EngineError::LimitExceeded("label too long"));
            }

        let started = Instant::now();
        let mut lease = self.locks.checkout(key);
        if tokio::time::timeout(self.config.lock_wait, lease.lock()).await.is_err() {
            warn!("gave up waiting for slot {key} after {:?}", self.config.lock_wait);
            metrics::counter!(RESERVATIONS_TOTAL, "outcome" => "lock_timeout").increment(1);
            return Err(EngineError::LockTimeout(key));
        }
        metrics::histogram!(LOCK_WAIT_SECONDS).record(started.elapsed().as_secs_f64());

        let booking = Booking {
            id: Ulid::new(),
            organization_id,
            key,
            label,
            status: BookingStatus::Booked,
            created_at: self.clock.now(),
        };
        let store = self.store.clone();
        let config = self.config.clone();
        let critical = tokio::spawn(async move {
            let _lease = lease;
            admit(store.as_ref(), &config, booking, max_capacity).await
        });

        let result = match critical.await {
            Ok(result) => result,
            Err(e) => Err(EngineError::AllocationFailed {
                key,
                reason: format!("reservation task aborted: {e}"),
            }),
        };

        metrics::histogram!(RESERVE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());
        let outcome = match &result {
            Ok(admission) => outcome_label(admission),
            Err(EngineError::AllocationFailed { .. }) => "allocation_failed",
            Err(_) => "error",
        };
        metrics::counter!(RESERVATIONS_TOTAL, "outcome" => outcome).increment(1);
        result
    }

    /// Book `key` for a customer.
    ///
    /// The slot must be one `list_available_slots` would offer right now
    /// (open day, on stride, outside breaks, not past); capacity is then
    /// checked atomically regardless of what any earlier listing showed.
    pub async fn book_slot(
        &self,
        key: SlotKey,
        service: &ServiceConfig,
        label: Option<String>,
    ) -> Result<Admission, EngineError> {
        let now = self.clock.now();
        let candidates = day_candidates(service, key.date, &now)?;
        let offered = key.service_id == service.service_id
            && candidates.iter().any(|c| c.time == key.time && !c.is_past);
        if !offered {
            debug!("slot {key} is not bookable at {now}");
            let outcome = Admission::Rejected(Rejection::InvalidSlot);
            metrics::counter!(RESERVATIONS_TOTAL, "outcome" => outcome_label(&outcome)).increment(1);
            return Ok(outcome);
        }
        self.try_reserve(key, service.organization_id, service.max_capacity(), label)
            .await
    }
}
