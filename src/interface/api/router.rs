//! API Router configuration

use super::calls_handler::{end_call, list_call_logs, start_call};
use super::health_handler::health_check;
use super::livekit_handler::issue_token;
use super::metrics_handler::metrics_handler;
use super::routing_handler::{delete_routing, get_routing, list_routing, put_routing};
use super::state::AppState;
use super::webhook_handler::{inbound, status, voice_get, voice_post};
use axum::{
    routing::{delete, get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the API router
pub fn build_router(state: AppState, prometheus_handle: PrometheusHandle) -> Router {
    // Health check route (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    // Client-facing call routes
    let call_routes = Router::new()
        .route("/calls/start", post(start_call))
        .route("/calls/end", post(end_call))
        .route("/call-logs", get(list_call_logs))
        .route("/livekit/token", post(issue_token));

    // Routing settings routes
    let routing_routes = Router::new()
        .route("/routing", get(list_routing))
        .route("/routing/:id", delete(delete_routing))
        .route(
            "/phone-numbers/:id/routing",
            get(get_routing).put(put_routing),
        );

    // Provider webhooks (no bearer auth, optional signature check)
    let webhook_routes = Router::new()
        .route("/twilio/voice", get(voice_get).post(voice_post))
        .route("/twilio/inbound", post(inbound))
        .route("/twilio/status", post(status));

    // Metrics route (separate state)
    let metrics_routes = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(prometheus_handle);

    Router::new()
        .merge(health_routes)
        .merge(call_routes)
        .merge(routing_routes)
        .merge(webhook_routes)
        .with_state(state)
        .merge(metrics_routes)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
