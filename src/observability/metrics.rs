//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status, rpc
//! - `gateway_request_duration_seconds` (histogram): latency by method, rpc
//! - `gateway_backend_calls_total` (counter): backend calls by rpc, outcome
//! - `gateway_backend_call_duration_seconds` (histogram): backend latency by rpc
//! - `gateway_in_flight_requests` (gauge): requests currently being handled
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until an
//!   exporter is installed
//! - The Prometheus exporter is optional and serves its own scrape endpoint

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Label used when a request never resolved to an RPC.
pub const NO_RPC: &str = "none";

/// Install the Prometheus recorder with an HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, rpc: &str, duration: Duration) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "rpc" => rpc.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "gateway_request_duration_seconds",
        "method" => method.to_string(),
        "rpc" => rpc.to_string()
    )
    .record(duration.as_secs_f64());
}

pub fn record_backend_call(rpc: &str, outcome: &'static str, duration: Duration) {
    metrics::counter!(
        "gateway_backend_calls_total",
        "rpc" => rpc.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_backend_call_duration_seconds", "rpc" => rpc.to_string())
        .record(duration.as_secs_f64());
}

pub fn set_in_flight(count: usize) {
    metrics::gauge!("gateway_in_flight_requests").set(count as f64);
}
