//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): completed cycles by method, status
//! - `gateway_cycle_duration_seconds` (histogram): time from accept to close
//! - `gateway_cycles_aborted_total` (counter): failed cycles by reason
//! - `gateway_connections_accepted_total` (counter)
//! - `gateway_active_connections` (gauge): 0 or 1 in the sequential server

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed request cycle.
pub fn record_request(method: &str, status_code: Option<u16>, started: Instant) {
    let status = status_code.map_or_else(|| "unknown".to_string(), |code| code.to_string());
    ::metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status
    )
    .increment(1);
    ::metrics::histogram!("gateway_cycle_duration_seconds").record(started.elapsed().as_secs_f64());
}

/// Record a cycle that ended without a response.
pub fn record_cycle_aborted(reason: &'static str) {
    ::metrics::counter!("gateway_cycles_aborted_total", "reason" => reason).increment(1);
}

pub fn record_connection_accepted() {
    ::metrics::counter!("gateway_connections_accepted_total").increment(1);
}

pub fn set_active_connections(count: u64) {
    ::metrics::gauge!("gateway_active_connections").set(count as f64);
}
