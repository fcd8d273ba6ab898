//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): inbound requests by route, status
//! - `relay_request_duration_seconds` (histogram): inbound latency by route
//! - `relay_hops_total` (counter): outbound hops by outcome
//! - `relay_hop_duration_seconds` (histogram): hop latency
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - Prometheus exposition only when enabled in config

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one inbound request.
pub fn record_request(route: &'static str, status: u16, started: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "route" => route,
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "route" => route)
        .record(started.elapsed().as_secs_f64());
}

/// Record one outbound hop.
pub fn record_hop(outcome: &'static str, started: Instant) {
    metrics::counter!("relay_hops_total", "outcome" => outcome).increment(1);
    metrics::histogram!("relay_hop_duration_seconds").record(started.elapsed().as_secs_f64());
}
