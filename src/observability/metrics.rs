//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, resource kind
//! - `proxy_request_duration_seconds` (histogram): time to response headers
//! - `proxy_rewrites_total` (counter): HTML rewrite outcomes
//!
//! # Design Decisions
//! - Labels stay low-cardinality: no namespaces or resource names

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint on `addr`.
///
/// Must be called from within the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(
            address = %addr,
            error = %e,
            "Failed to install metrics exporter"
        ),
    }
}

/// Record one proxied request.
pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("kind", kind.to_string()),
    ];
    metrics::counter!("proxy_requests_total", &labels).increment(1);
    metrics::histogram!("proxy_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one HTML rewrite attempt.
pub fn record_rewrite(outcome: &'static str) {
    metrics::counter!("proxy_rewrites_total", "outcome" => outcome).increment(1);
}
