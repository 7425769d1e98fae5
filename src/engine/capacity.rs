use std::collections::HashMap;

use crate::model::*;

use super::slots::Candidate;

/// Per-slot capacity figures for one service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityRule {
    pub staff_count: u32,
    pub overbooking_limit: u32,
    pub average_service_time: u32,
}

impl CapacityRule {
    pub fn of(config: &ServiceConfig) -> Self {
        Self {
            staff_count: config.staff_count,
            overbooking_limit: config.overbooking_limit,
            average_service_time: config.average_service_time,
        }
    }

    pub fn max_capacity(&self) -> u32 {
        self.staff_count.saturating_add(self.overbooking_limit)
    }
}

/// Count active bookings per start time.
fn tally(bookings: &[Booking]) -> HashMap<TimeOfDay, u32> {
    let mut counts = HashMap::new();
    for b in bookings.iter().filter(|b| b.is_active()) {
        *counts.entry(b.key.time).or_insert(0) += 1;
    }
    counts
}

/// Build the slot view for one candidate given its active booking count.
pub fn evaluate_slot(candidate: Candidate, bookings_count: u32, rule: &CapacityRule) -> Slot {
    let max_capacity = rule.max_capacity();
    let raw = i64::from(max_capacity) - i64::from(bookings_count);
    let capacity = raw.max(0) as u32;
    let deficit = (-raw).max(0) as u32;
    let waves = bookings_count / rule.staff_count.max(1);
    Slot {
        time: candidate.time,
        capacity,
        deficit,
        bookings_count,
        max_capacity,
        is_available: capacity > 0 && !candidate.is_past,
        is_past: candidate.is_past,
        estimated_wait_minutes: waves.saturating_mul(rule.average_service_time),
    }
}

/// Overlay a bookings snapshot on candidate times.
///
/// Read-only and safe on stale data; the result is for display and must
/// never be the sole gate for admission.
pub fn evaluate_availability(candidates: &[Candidate], bookings: &[Booking], rule: &CapacityRule) -> Vec<Slot> {
    let counts = tally(bookings);
    candidates
        .iter()
        .map(|&c| evaluate_slot(c, counts.get(&c.time).copied().unwrap_or(0), rule))
        .collect()
}
