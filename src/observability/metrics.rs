//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gatekeeper_requests_total` (counter): requests by method, status
//! - `gatekeeper_request_duration_seconds` (histogram): latency distribution
//! - `gatekeeper_rate_limited_total` (counter): admission rejections
//! - `gatekeeper_auth_rejected_total` (counter): auth rejections by reason
//! - `gatekeeper_tokens_issued_total` (counter): tokens created at login
//! - `gatekeeper_limiter_clients` (gauge): client keys tracked by the limiter
//!
//! Recording is a no-op until a recorder is installed, so tests never need one.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let method = method.to_string();
    counter!(
        "gatekeeper_requests_total",
        "method" => method.clone(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gatekeeper_request_duration_seconds", "method" => method)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    counter!("gatekeeper_rate_limited_total").increment(1);
}

pub fn record_auth_rejected(reason: &'static str) {
    counter!("gatekeeper_auth_rejected_total", "reason" => reason).increment(1);
}

pub fn record_token_issued() {
    counter!("gatekeeper_tokens_issued_total").increment(1);
}

pub fn record_limiter_clients(count: usize) {
    gauge!("gatekeeper_limiter_clients").set(count as f64);
}

/// Counts every response, including gate rejections and timeouts.
pub async fn track_requests(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = next.run(request).await;
    record_request(method.as_str(), response.status().as_u16(), start);
    response
}
