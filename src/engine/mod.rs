mod allocation;
mod capacity;
mod error;
mod mutations;
mod queries;
mod slots;
mod store;

pub use allocation::{SlotLease, SlotLocks};
pub use capacity::{CapacityRule, evaluate_availability, evaluate_slot};
pub use error::{EngineError, StoreError};
pub use queries::{available_slots, day_schedule};
pub use slots::{Candidate, candidate_times, generate_candidate_slots, is_past};
pub use store::{BookingStore, InMemoryStore};

use std::future::Future;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;

/// Availability queries and race-free admission over an external booking store.
pub struct Engine {
    pub(super) store: Arc<dyn BookingStore>,
    pub(super) locks: Arc<SlotLocks>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) config: EngineConfig,
}

impl Engine {
    pub fn new(store: Arc<dyn BookingStore>, config: EngineConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn BookingStore>, config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            locks: Arc::new(SlotLocks::new()),
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Live entries in the per-slot lock table.
    pub fn lock_table_len(&self) -> usize {
        self.locks.len()
    }
}

/// Run a store read, retrying transient failures with exponential backoff.
///
/// Only for reads: nothing here may wrap a write whose outcome is unknown.
pub(crate) async fn read_with_retry<T, F, Fut>(config: &EngineConfig, what: &str, mut op: F) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_transient() && attempt < config.read_retries => {
                attempt += 1;
                let backoff = config.backoff_for(attempt);
                tracing::warn!("{what}: {e}; retry {attempt}/{} in {backoff:?}", config.read_retries);
                metrics::counter!(crate::observability::STORE_READ_RETRIES_TOTAL).increment(1);
                tokio::time::sleep(backoff).await;
            }
            other => return other,
        }
    }
}
