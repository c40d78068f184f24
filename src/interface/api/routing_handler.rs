//! Inbound routing settings handlers

use super::auth::AuthUser;
use super::dto::{RoutingRuleRequest, RoutingRuleResponse};
use super::error::ApiError;
use super::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use uuid::Uuid;

/// Get the routing rule of a phone number (`null` when none is configured)
pub async fn get_routing(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(phone_number_id): Path<Uuid>,
) -> Result<Json<Option<RoutingRuleResponse>>, ApiError> {
    let rule = state
        .routing_settings
        .get_rule(auth.user_id, phone_number_id)
        .await?;
    Ok(Json(rule.map(Into::into)))
}

/// Create or update the routing rule of a phone number
pub async fn put_routing(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(phone_number_id): Path<Uuid>,
    body: Result<Json<RoutingRuleRequest>, JsonRejection>,
) -> Result<Json<RoutingRuleResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    info!(user_id = %auth.user_id, phone_number_id = %phone_number_id, "API: Saving routing rule");

    let rule = state
        .routing_settings
        .save_rule(auth.user_id, phone_number_id, req.into_update()?)
        .await?;
    Ok(Json(rule.into()))
}

/// Delete a routing rule
pub async fn delete_routing(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    Path(rule_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state
        .routing_settings
        .delete_rule(auth.user_id, rule_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's routing rules
pub async fn list_routing(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
) -> Result<Json<Vec<RoutingRuleResponse>>, ApiError> {
    let rules = state.routing_settings.list_rules(auth.user_id).await?;
    Ok(Json(rules.into_iter().map(Into::into).collect()))
}
