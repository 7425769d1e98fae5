use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use ulid::Ulid;

use crate::model::*;

use super::StoreError;

/// The record store the engine reads bookings from and admits bookings into.
///
/// The engine serializes `occupancy` + `insert_booking` per slot key under
/// its own lock, so an implementation only has to make a write visible to
/// the next `occupancy` read of the same key (read-your-writes). Stores that
/// cannot promise that need a conditional write instead.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Every booking (any status) of one service on one date.
    async fn bookings_for_date(
        &self,
        organization_id: Ulid,
        service_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError>;

    /// Active bookings currently held against `key`.
    async fn occupancy(&self, key: &SlotKey) -> Result<u32, StoreError>;

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError>;
}

/// Process-local store, bucketed by `(service, date)`.
pub struct InMemoryStore {
    days: DashMap<(Ulid, NaiveDate), Vec<Booking>>,
    /// Reverse lookup: booking id → bucket
    index: DashMap<Ulid, (Ulid, NaiveDate)>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            days: DashMap::new(),
            index: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn get(&self, id: &Ulid) -> Option<Booking> {
        let bucket = *self.index.get(id)?;
        self.days
            .get(&bucket)?
            .iter()
            .find(|b| b.id == *id)
            .cloned()
    }

    /// Seed a record as-is, bypassing admission. Used to load legacy data.
    pub fn load(&self, booking: Booking) {
        let bucket = (booking.key.service_id, booking.key.date);
        self.index.insert(booking.id, bucket);
        self.days.entry(bucket).or_default().push(booking);
    }

    /// Move a booking to a new status (cancel, no-show, complete).
    pub fn set_status(&self, id: Ulid, status: BookingStatus) -> Result<Booking, StoreError> {
        let bucket = *self.index.get(&id).ok_or(StoreError::NotFound(id))?;
        let mut day = self.days.get_mut(&bucket).ok_or(StoreError::NotFound(id))?;
        let booking = day
            .iter_mut()
            .find(|b| b.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if !booking.status.can_transition_to(status) {
            return Err(StoreError::InvalidTransition { from: booking.status, to: status });
        }
        booking.status = status;
        Ok(booking.clone())
    }

    pub fn active_count(&self, key: &SlotKey) -> u32 {
        self.days
            .get(&(key.service_id, key.date))
            .map(|day| {
                day.iter()
                    .filter(|b| b.key.time == key.time && b.is_active())
                    .count() as u32
            })
            .unwrap_or(0)
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn bookings_for_date(
        &self,
        organization_id: Ulid,
        service_id: Ulid,
        date: NaiveDate,
    ) -> Result<Vec<Booking>, StoreError> {
        Ok(self
            .days
            .get(&(service_id, date))
            .map(|day| {
                day.iter()
                    .filter(|b| b.organization_id == organization_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn occupancy(&self, key: &SlotKey) -> Result<u32, StoreError> {
        Ok(self.active_count(key))
    }

    async fn insert_booking(&self, booking: Booking) -> Result<(), StoreError> {
        if self.index.contains_key(&booking.id) {
            return Err(StoreError::Permanent(format!("duplicate booking id {}", booking.id)));
        }
        self.load(booking);
        Ok(())
    }
}
