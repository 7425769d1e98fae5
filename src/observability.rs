use std::net::SocketAddr;

use crate::model::{Admission, Rejection};

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: reservation attempts. Labels: outcome.
pub const RESERVATIONS_TOTAL: &str = "slotkeeper_reservations_total";

/// Histogram: time from lock request to outcome, in seconds.
pub const RESERVE_DURATION_SECONDS: &str = "slotkeeper_reserve_duration_seconds";

/// Counter: availability evaluations served. Labels: view.
pub const SLOT_QUERIES_TOTAL: &str = "slotkeeper_slot_queries_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Histogram: time spent waiting for a slot lock, in seconds.
pub const LOCK_WAIT_SECONDS: &str = "slotkeeper_lock_wait_seconds";

/// Gauge: live entries in the per-slot lock table.
pub const LOCK_TABLE_ENTRIES: &str = "slotkeeper_lock_table_entries";

/// Counter: transient store reads that were retried.
pub const STORE_READ_RETRIES_TOTAL: &str = "slotkeeper_store_read_retries_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) {
    let Some(port) = port else { return };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
    {
        tracing::error!("failed to install Prometheus metrics exporter: {e}");
        return;
    }
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
}

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
/// Safe to call more than once.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Map a reservation result to a short label for metrics.
pub fn outcome_label(outcome: &Admission) -> &'static str {
    match outcome {
        Admission::Admitted(_) => "admitted",
        Admission::Rejected(Rejection::SlotFull) => "slot_full",
        Admission::Rejected(Rejection::InvalidSlot) => "invalid_slot",
    }
}
