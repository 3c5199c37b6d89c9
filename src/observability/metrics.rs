//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bridge_mechanism_actions_total` (counter): by mechanism, action, outcome
//! - `bridge_settlements_total` (counter): by decision
//! - `bridge_reconciliations_total` (counter): by result
//! - `bridge_rpc_failovers_total` (counter): provider skipped after an error
//! - `bridge_http_requests_total` (counter): by path, status
//! - `bridge_confirmation_seconds` (histogram): submit → receipt latency

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_mechanism_action(mechanism: &str, action: &str, ok: bool) {
    metrics::counter!(
        "bridge_mechanism_actions_total",
        "mechanism" => mechanism.to_string(),
        "action" => action.to_string(),
        "outcome" => if ok { "ok" } else { "error" }
    )
    .increment(1);
}

pub fn record_settlement(decision: &'static str) {
    metrics::counter!("bridge_settlements_total", "decision" => decision).increment(1);
}

pub fn record_reconciliation(result: &'static str) {
    metrics::counter!("bridge_reconciliations_total", "result" => result).increment(1);
}

pub fn record_rpc_failover() {
    metrics::counter!("bridge_rpc_failovers_total").increment(1);
}

pub fn record_http_request(path: &str, status: u16) {
    metrics::counter!(
        "bridge_http_requests_total",
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_confirmation(elapsed: Duration) {
    metrics::histogram!("bridge_confirmation_seconds").record(elapsed.as_secs_f64());
}
