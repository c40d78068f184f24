//! Room token handler

use super::auth::AuthUser;
use super::dto::{RoomTokenRequest, RoomTokenResponse};
use super::error::ApiError;
use super::state::AppState;
use crate::application::RoomTokenCommand;
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

/// Issue a room-join token for the caller
pub async fn issue_token(
    State(state): State<AppState>,
    AuthUser(auth): AuthUser,
    body: Result<Json<RoomTokenRequest>, JsonRejection>,
) -> Result<Json<RoomTokenResponse>, ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let token = state
        .livekit
        .issue(
            &auth,
            RoomTokenCommand {
                room_name: req.room_name.unwrap_or_default(),
                lead_id: req.lead_id,
                campaign_id: req.campaign_id,
            },
        )
        .await?;

    Ok(Json(token.into()))
}
