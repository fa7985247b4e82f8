//! Metrics exposition.
//!
//! # Responsibilities
//! - Install the Prometheus exporter when metrics are enabled
//!
//! # Design Decisions
//! - The stats registry mirrors its counters to the `metrics` facade; this
//!   module only wires the facade to a scrape endpoint
//! - Exporter failure is logged, never fatal: routing works without it

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus scrape endpoint at `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter started"),
        Err(error) => {
            tracing::error!(error = %error, address = %addr, "Failed to start metrics exporter")
        }
    }
}
