//! Prometheus metrics handler

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use metrics::describe_counter;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe_metrics();
    Ok(handle)
}

fn describe_metrics() {
    describe_counter!(
        "beavy_calls_started_total",
        "Outbound calls accepted by the telephony provider"
    );
    describe_counter!(
        "beavy_provider_failures_total",
        "Outbound calls the telephony provider rejected"
    );
    describe_counter!(
        "beavy_inbound_calls_total",
        "Inbound calls routed, by routing type"
    );
    describe_counter!(
        "beavy_webhook_fallbacks_total",
        "Webhooks answered with the apology document"
    );
    describe_counter!(
        "beavy_webhook_signature_failures_total",
        "Webhooks rejected for an invalid provider signature"
    );
    describe_counter!(
        "beavy_finalizations_total",
        "Call finalizations, by result"
    );
}

/// HTTP metrics handler
pub async fn metrics_handler(State(prometheus_handle): State<PrometheusHandle>) -> Response {
    let metrics = prometheus_handle.render();
    (StatusCode::OK, metrics).into_response()
}
