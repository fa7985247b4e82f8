//! Routing statistics registry.
//!
//! # Responsibilities
//! - Hold the process-wide routing counters
//! - Serve query-by-name reads for the `stats` command and admin surface
//! - Mirror every increment to the `metrics` facade for Prometheus scrape
//!
//! # Design Decisions
//! - Counter names are an exact-match external contract; existing monitoring
//!   queries them by these strings
//! - Monotonic only: nothing ever decrements or resets a counter in-process
//! - Plain atomic increments; concurrent writers from all shards lose nothing

use std::sync::atomic::{AtomicU64, Ordering};

/// Error replies surfaced to clients.
pub const RESULT_ERROR_COUNT: &str = "result_error_count";
/// Candidates attempted and failed (transport error or timeout).
pub const FAILOVER_POLICY_RESULT_ERROR: &str = "failover_policy_result_error";
/// Candidates skipped without an attempt because they were knocked out.
pub const FAILOVER_POLICY_TKO_ERROR: &str = "failover_policy_tko_error";
/// Policy entries that resolved to an already-consumed destination.
pub const FAILOVER_NUM_COLLISIONS: &str = "failover_num_collisions";
/// Requests that exhausted every candidate.
pub const FAILOVER_ALL_FAILED: &str = "failover_all_failed";

/// All counter names, in reporting order.
pub const COUNTER_NAMES: [&str; 5] = [
    RESULT_ERROR_COUNT,
    FAILOVER_POLICY_RESULT_ERROR,
    FAILOVER_POLICY_TKO_ERROR,
    FAILOVER_NUM_COLLISIONS,
    FAILOVER_ALL_FAILED,
];

/// Process-wide monotonic routing counters.
///
/// Written only by the failover engine; read at any time by the reporting
/// surfaces.
#[derive(Debug, Default)]
pub struct StatsRegistry {
    result_error_count: AtomicU64,
    failover_policy_result_error: AtomicU64,
    failover_policy_tko_error: AtomicU64,
    failover_num_collisions: AtomicU64,
    failover_all_failed: AtomicU64,
}

impl StatsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn incr_result_error(&self) {
        self.result_error_count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(RESULT_ERROR_COUNT).increment(1);
    }

    pub fn incr_policy_result_error(&self) {
        self.failover_policy_result_error.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(FAILOVER_POLICY_RESULT_ERROR).increment(1);
    }

    pub fn incr_policy_tko_error(&self) {
        self.failover_policy_tko_error.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(FAILOVER_POLICY_TKO_ERROR).increment(1);
    }

    pub fn incr_collisions(&self) {
        self.failover_num_collisions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(FAILOVER_NUM_COLLISIONS).increment(1);
    }

    pub fn incr_all_failed(&self) {
        self.failover_all_failed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(FAILOVER_ALL_FAILED).increment(1);
    }

    /// Current value of a counter by its contract name.
    pub fn get(&self, name: &str) -> Option<u64> {
        let value = match name {
            RESULT_ERROR_COUNT => &self.result_error_count,
            FAILOVER_POLICY_RESULT_ERROR => &self.failover_policy_result_error,
            FAILOVER_POLICY_TKO_ERROR => &self.failover_policy_tko_error,
            FAILOVER_NUM_COLLISIONS => &self.failover_num_collisions,
            FAILOVER_ALL_FAILED => &self.failover_all_failed,
            _ => return None,
        };
        Some(value.load(Ordering::Relaxed))
    }

    /// All counters in reporting order.
    pub fn snapshot(&self) -> Vec<(&'static str, u64)> {
        COUNTER_NAMES
            .iter()
            .map(|&name| {
                let value = self.get(name).unwrap_or(0);
                (name, value)
            })
            .collect()
    }
}
