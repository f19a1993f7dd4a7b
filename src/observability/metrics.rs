//! Metrics collection and exposition.
//!
//! # Metrics
//! - `spnego_rewrites_total` (counter): requests rewritten by the segment router
//! - `spnego_routing_errors_total` (counter): rewrites that failed
//! - `spnego_sign_attempts_total{outcome}` (counter): sign attempts by outcome
//! - `spnego_credential_refreshes_total{outcome}` (counter): refresh attempts by outcome

use std::net::SocketAddr;

use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter and register metric descriptions.
pub fn init_metrics(addr: SocketAddr) {
    if let Err(error) = PrometheusBuilder::new().with_http_listener(addr).install() {
        tracing::error!(%error, "failed to install metrics exporter");
        return;
    }

    describe_counter!(
        "spnego_rewrites_total",
        "Requests whose target was rewritten from a path segment"
    );
    describe_counter!(
        "spnego_routing_errors_total",
        "Requests forwarded unmodified because the rewrite failed"
    );
    describe_counter!(
        "spnego_sign_attempts_total",
        "SPNEGO header sign attempts by outcome"
    );
    describe_counter!(
        "spnego_credential_refreshes_total",
        "Credential refresh attempts by outcome"
    );

    tracing::info!(address = %addr, "metrics exporter listening");
}

pub fn record_rewrite() {
    counter!("spnego_rewrites_total").increment(1);
}

pub fn record_routing_error() {
    counter!("spnego_routing_errors_total").increment(1);
}

pub fn record_sign(success: bool) {
    counter!("spnego_sign_attempts_total", "outcome" => outcome(success)).increment(1);
}

pub fn record_refresh(success: bool) {
    counter!("spnego_credential_refreshes_total", "outcome" => outcome(success)).increment(1);
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}
