//! Metrics collection and exposition.
//!
//! # Metrics
//! - `removeip_requests_total` (counter): finished requests by status
//! - `removeip_request_duration_seconds` (histogram): latency distribution
//! - `removeip_masked_requests_total` (counter): masked requests by scope
//! - `removeip_restorations_total` (counter): addresses written back
//! - `removeip_stage_errors_total` (counter): requests failed by the pipeline
//! - `removeip_access_denied_total` (counter): access phase rejections
//!
//! Recording is a no-op until a recorder is installed.

use std::net::SocketAddr;
use std::time::Instant;

use ::metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(status: u16, start: Instant) {
    counter!("removeip_requests_total", "status" => status.to_string()).increment(1);
    histogram!("removeip_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_masked(scope: &str) {
    counter!("removeip_masked_requests_total", "scope" => scope.to_owned()).increment(1);
}

pub fn record_restored() {
    counter!("removeip_restorations_total").increment(1);
}

pub fn record_stage_error(kind: &'static str) {
    counter!("removeip_stage_errors_total", "kind" => kind).increment(1);
}

pub fn record_access_denied() {
    counter!("removeip_access_denied_total").increment(1);
}
