//! Call API handlers

use super::auth::AuthUser;
use super::dto::{
    CallLogListResponse, EndCallRequest, EndCallResponse, StartCallRequest, StartCallResponse,
};
use super::error::ApiError;
use super::state::AppState;
use crate::application::FinalizeResult;
use crate::domain::shared::DomainError;
use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::{error, info, warn};

/// Query parameters for listing call logs
#[derive(Debug, Deserialize)]
pub struct ListCallLogsQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Originate an outbound call
pub async fn start_call(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    body: Result<Json<StartCallRequest>, JsonRejection>,
) -> Result<Json<StartCallResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!(user_id = %auth.user_id, "API: Starting outbound call");

    let started = state
        .call_initiator
        .start_call(auth.user_id, req.into())
        .await?;

    Ok(Json(started.into()))
}

/// Apply end-of-call facts to a call log
pub async fn end_call(
    State(state): State<AppState>,
    body: Result<Json<EndCallRequest>, JsonRejection>,
) -> (StatusCode, Json<EndCallResponse>) {
    let req = match body {
        Ok(Json(req)) => req,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(EndCallResponse::failure(e.body_text())),
            )
        }
    };

    match state.call_finalizer.finalize(req.into()).await {
        Ok(FinalizeResult::Finalized {
            call_log_id,
            already_applied,
        }) => (
            StatusCode::OK,
            Json(EndCallResponse {
                success: true,
                call_log_id: Some(call_log_id),
                already_applied: already_applied.then_some(true),
                error: None,
            }),
        ),
        Ok(FinalizeResult::NotFound) => (
            StatusCode::OK,
            Json(EndCallResponse::failure("Call log not found")),
        ),
        Err(DomainError::ValidationError(message)) => {
            warn!(%message, "API: Rejected call finalization");
            (StatusCode::BAD_REQUEST, Json(EndCallResponse::failure(message)))
        }
        Err(e) => {
            error!(error = %e, "API: Failed to finalize call");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(EndCallResponse::failure(e.to_string())),
            )
        }
    }
}

/// List the caller's call logs, newest first
pub async fn list_call_logs(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Query(query): Query<ListCallLogsQuery>,
) -> Result<Json<CallLogListResponse>, ApiError> {
    let limit = query.limit.clamp(1, 500);
    let offset = query.offset.max(0);

    let logs = state
        .call_logs
        .list_for_user(auth.user_id, limit, offset)
        .await?;
    let total = state.call_logs.count_for_user(auth.user_id).await?;

    Ok(Json(CallLogListResponse {
        call_logs: logs.into_iter().map(Into::into).collect(),
        total,
        limit,
        offset,
    }))
}
