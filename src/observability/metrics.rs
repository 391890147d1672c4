//! Metrics collection and exposition.

use std::net::SocketAddr;

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Initialize the Prometheus exporter and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!("Metrics server listening on http://{}", addr);
}

/// Record an admission pipeline outcome ("admitted" or a denial label).
pub fn record_admission(outcome: &'static str) {
    counter!("proxy_admission_total", "outcome" => outcome).increment(1);
}

/// Record the status code an upstream returned.
pub fn record_upstream_status(status: u16) {
    counter!("proxy_upstream_responses_total", "status" => status.to_string()).increment(1);
}

/// Record an upstream exchange failure ("transport" or "timeout").
pub fn record_upstream_error(kind: &'static str) {
    counter!("proxy_upstream_errors_total", "kind" => kind).increment(1);
}

/// Record a locally-served dispatch (file or handler body).
pub fn record_dispatch(kind: &'static str) {
    counter!("proxy_dispatch_total", "kind" => kind).increment(1);
}

/// Track open proxied WebSocket sessions.
pub fn record_ws_session(delta: i64) {
    gauge!("proxy_websocket_sessions").increment(delta as f64);
}
