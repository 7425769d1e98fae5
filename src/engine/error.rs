use thiserror::Error;
use ulid::Ulid;

use crate::model::{BookingStatus, SlotKey};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid time format: {0:?} (expected HH:MM)")]
    InvalidFormat(String),
    #[error("invalid service config: {0}")]
    InvalidConfig(String),
    #[error("limit exceeded: {0}")]
    LimitExceeded(&'static str),
    #[error("timed out waiting for slot {0}")]
    LockTimeout(SlotKey),
    /// The insert inside the critical section failed; whether it landed is unknown.
    #[error("allocation failed for slot {key}: {reason}")]
    AllocationFailed { key: SlotKey, reason: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failures reported by a `BookingStore`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Network blip, timeout, throttling: the same call may succeed later.
    #[error("transient store failure: {0}")]
    Transient(String),
    #[error("store failure: {0}")]
    Permanent(String),
    #[error("booking not found: {0}")]
    NotFound(Ulid),
    #[error("booking cannot move from {from:?} to {to:?}")]
    InvalidTransition { from: BookingStatus, to: BookingStatus },
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}
