//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_simulations_total` (counter): dry runs by outcome
//! - `relay_submissions_total` (counter): submissions by outcome
//! - `relay_status_polls_total` (counter): status queries issued
//! - `relay_confirmation_seconds` (histogram): submit-to-terminal latency

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_simulation(outcome: &'static str) {
    counter!("relay_simulations_total", "outcome" => outcome).increment(1);
}

pub fn record_submission(outcome: &'static str) {
    counter!("relay_submissions_total", "outcome" => outcome).increment(1);
}

pub fn record_status_poll() {
    counter!("relay_status_polls_total").increment(1);
}

pub fn record_confirmation_latency(elapsed: Duration, outcome: &'static str) {
    histogram!("relay_confirmation_seconds", "outcome" => outcome).record(elapsed.as_secs_f64());
}
