use std::time::Duration;

/// Engine tuning knobs. Service configuration is not here: it is handed
/// to each call as data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Extra attempts for a transient occupancy read before giving up.
    pub read_retries: u32,
    /// Backoff before the first retry; doubles on each further attempt.
    pub retry_backoff: Duration,
    /// Longest a reservation waits for its slot lock.
    pub lock_wait: Duration,
    pub metrics_port: Option<u16>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            read_retries: 3,
            retry_backoff: Duration::from_millis(20),
            lock_wait: Duration::from_secs(5),
            metrics_port: None,
        }
    }
}

impl EngineConfig {
    /// Read `SLOTKEEPER_*` variables; anything unset or unparsable keeps its default.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let parse = |name: &str| lookup(name).and_then(|s| s.parse::<u64>().ok());

        Self {
            read_retries: parse("SLOTKEEPER_READ_RETRIES")
                .and_then(|n| u32::try_from(n).ok())
                .unwrap_or(defaults.read_retries),
            retry_backoff: parse("SLOTKEEPER_RETRY_BACKOFF_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_backoff),
            lock_wait: parse("SLOTKEEPER_LOCK_WAIT_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.lock_wait),
            metrics_port: lookup("SLOTKEEPER_METRICS_PORT").and_then(|s| s.parse().ok()),
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.retry_backoff
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}
