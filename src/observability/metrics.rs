//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by forwarder, method, status
//! - `proxy_request_duration_seconds` (histogram): latency by forwarder
//! - `proxy_upstream_errors_total` (counter): failed upstream exchanges by forwarder and kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished inbound request.
pub fn record_request(forwarder: &'static str, method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "forwarder" => forwarder,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!("proxy_request_duration_seconds", "forwarder" => forwarder)
        .record(start.elapsed().as_secs_f64());
}

/// Record an upstream exchange that produced no response.
pub fn record_upstream_error(forwarder: &'static str, kind: &'static str) {
    counter!("proxy_upstream_errors_total", "forwarder" => forwarder, "kind" => kind).increment(1);
}
