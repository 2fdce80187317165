//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dispatch_requests_total` (counter): requests by strategy, status
//! - `dispatch_request_duration_seconds` (histogram): latency by strategy
//! - `dispatch_selection_cache_total` (counter): selection cache hit/miss
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, so tests need no setup
//! - The Prometheus exporter is installed once at startup when enabled

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record one dispatched request. `strategy` is `none` when selection failed.
pub fn record_dispatch(strategy: &'static str, status: u16, start: Instant) {
    metrics::counter!(
        "dispatch_requests_total",
        "strategy" => strategy,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("dispatch_request_duration_seconds", "strategy" => strategy)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_selection(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    metrics::counter!("dispatch_selection_cache_total", "result" => result).increment(1);
}
