//! LiveKit room-join capability tokens
//!
//! A token is an HS256 JWT signed with the LiveKit API secret. It proves the
//! bearer may join one room for a bounded time.

use super::shared::{DomainError, Result};
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

/// Room permissions granted by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrant {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
    pub can_publish_data: bool,
}

impl VideoGrant {
    /// Full participant rights in one room
    pub fn participant(room: &str) -> Self {
        Self {
            room: room.to_string(),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
            can_publish_data: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveKitClaims {
    /// API key
    pub iss: String,
    /// Participant identity
    pub sub: String,
    pub name: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub video: VideoGrant,
}

/// Signs room-join tokens
#[derive(Clone)]
pub struct LiveKitTokenIssuer {
    api_key: String,
    encoding_key: EncodingKey,
    ttl_secs: i64,
}

impl LiveKitTokenIssuer {
    pub fn new(api_key: &str, api_secret: &str, ttl_secs: i64) -> Self {
        Self {
            api_key: api_key.to_string(),
            encoding_key: EncodingKey::from_secret(api_secret.as_bytes()),
            ttl_secs,
        }
    }

    /// Token letting `identity` join `room`
    pub fn issue_room_token(&self, room: &str, identity: &str, name: &str) -> Result<String> {
        if room.trim().is_empty() {
            return Err(DomainError::ValidationError("roomName is required".to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = LiveKitClaims {
            iss: self.api_key.clone(),
            sub: identity.to_string(),
            name: name.to_string(),
            iat: now,
            nbf: now,
            exp: now + self.ttl_secs,
            video: VideoGrant::participant(room),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::Internal(format!("failed to sign room token: {}", e)))
    }
}

/// Participant identity for an application user
pub fn participant_identity(user_id: uuid::Uuid) -> String {
    format!("user-{}", user_id)
}
