//! Provider-facing webhook handlers
//!
//! These answer the telephony provider, not our clients: every outcome is a
//! TwiML document (or an empty 204 for status callbacks), never an error
//! body.

use super::state::AppState;
use crate::application::{InboundCall, StatusCallback};
use crate::infrastructure::protocols::twiml::{self, VoiceResponse};
use crate::infrastructure::telephony::SIGNATURE_HEADER;
use axum::{
    extract::{rejection::FormRejection, OriginalUri, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{error, warn};

type FormParams = BTreeMap<String, String>;

#[derive(Debug, Default, Deserialize)]
pub struct VoiceQuery {
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

fn twiml_response(response: VoiceResponse) -> Response {
    (
        [(header::CONTENT_TYPE, twiml::CONTENT_TYPE)],
        response.render(),
    )
        .into_response()
}

fn form_params(form: Result<Form<FormParams>, FormRejection>) -> FormParams {
    match form {
        Ok(Form(params)) => params,
        Err(e) => {
            warn!(error = %e, "Unreadable webhook form body");
            FormParams::new()
        }
    }
}

/// Whether the request carries a valid provider signature (or checking is off)
fn signature_ok(state: &AppState, uri: &OriginalUri, headers: &HeaderMap, params: &FormParams) -> bool {
    let Some(verifier) = &state.webhook_verifier else {
        return true;
    };

    let path_and_query = uri
        .0
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.0.path());
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    let valid = verifier.verify(path_and_query, params, signature);
    if !valid {
        warn!(path = path_and_query, "Rejected webhook with invalid signature");
        metrics::counter!("beavy_webhook_signature_failures_total").increment(1);
    }
    valid
}

fn param(params: &FormParams, name: &str) -> Option<String> {
    params.get(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// `GET /twilio/voice`
pub async fn voice_get(
    State(state): State<AppState>,
    query: Option<Query<VoiceQuery>>,
) -> Response {
    let query = query.map(|Query(q)| q).unwrap_or_default();
    twiml_response(state.voice_webhook.respond(query.session_id.as_deref()).await)
}

/// `POST /twilio/voice`
pub async fn voice_post(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    query: Option<Query<VoiceQuery>>,
    form: Result<Form<FormParams>, FormRejection>,
) -> Response {
    let params = form_params(form);
    if !signature_ok(&state, &uri, &headers, &params) {
        return twiml_response(state.voice_webhook.apology());
    }

    let query = query.map(|Query(q)| q).unwrap_or_default();
    twiml_response(state.voice_webhook.respond(query.session_id.as_deref()).await)
}

/// `POST /twilio/inbound`
pub async fn inbound(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    form: Result<Form<FormParams>, FormRejection>,
) -> Response {
    let params = form_params(form);
    if !signature_ok(&state, &uri, &headers, &params) {
        return twiml_response(VoiceResponse::apology(&state.language));
    }

    let call = InboundCall {
        call_sid: param(&params, "CallSid"),
        from: param(&params, "From").unwrap_or_default(),
        to: param(&params, "To").unwrap_or_default(),
        call_status: param(&params, "CallStatus"),
    };

    twiml_response(state.inbound_router.route(&call).await)
}

/// `POST /twilio/status`
pub async fn status(
    State(state): State<AppState>,
    uri: OriginalUri,
    headers: HeaderMap,
    form: Result<Form<FormParams>, FormRejection>,
) -> StatusCode {
    let params = form_params(form);
    if !signature_ok(&state, &uri, &headers, &params) {
        return StatusCode::NO_CONTENT;
    }

    let callback = StatusCallback {
        call_sid: param(&params, "CallSid").unwrap_or_default(),
        call_status: param(&params, "CallStatus").unwrap_or_default(),
        call_duration: param(&params, "CallDuration").and_then(|d| d.parse().ok()),
    };

    if let Err(e) = state.status_callbacks.handle(&callback).await {
        error!(
            call_sid = %callback.call_sid,
            status = %callback.call_status,
            error = %e,
            "Failed to record call status"
        );
    }
    StatusCode::NO_CONTENT
}
