//! Bearer authentication extractor

use super::error::ApiError;
use super::state::AppState;
use crate::domain::api_auth::AuthContext;
use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::debug;

/// Authenticated caller; rejects with 401 `{ error }`
#[derive(Debug, Clone)]
pub struct AuthUser(pub AuthContext);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        state
            .auth
            .authenticate_header(header)
            .map(AuthUser)
            .map_err(|e| {
                debug!(error = %e, path = %parts.uri.path(), "Rejected request");
                ApiError::from(e)
            })
    }
}
