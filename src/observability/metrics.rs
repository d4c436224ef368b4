//! Metrics collection and exposition.
//!
//! # Metrics
//! - `fleet_auth_failures_total` (counter): by failing check
//! - `fleet_rate_limited_total` (counter): by limiter scope
//! - `fleet_broker_dispatches_total` (counter): by delivery outcome
//! - `fleet_broker_mode` (gauge): 1=connected, 0=degraded

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_auth_failure(check: &'static str) {
    metrics::counter!("fleet_auth_failures_total", "check" => check).increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    metrics::counter!("fleet_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_dispatch(delivered: bool) {
    let outcome = if delivered { "delivered" } else { "dropped" };
    metrics::counter!("fleet_broker_dispatches_total", "outcome" => outcome).increment(1);
}

pub fn record_broker_mode(connected: bool) {
    metrics::gauge!("fleet_broker_mode").set(if connected { 1.0 } else { 0.0 });
}
