//! Bearer-token authentication for the client-facing API
//!
//! Tokens are HS256 JWTs whose `sub` is the user id, as issued by the
//! hosted auth backend. Provider-facing webhooks never go through here.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT token claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (user ID)
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl TokenClaims {
    pub fn new(user_id: Uuid, email: Option<String>, expiry_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role: Some("authenticated".to_string()),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(expiry_seconds)).timestamp(),
        }
    }
}

/// Authentication context of a verified caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub email: Option<String>,
}

impl AuthContext {
    /// Display name for media participants
    pub fn display_name(&self) -> String {
        self.email.clone().unwrap_or_else(|| "User".to_string())
    }
}

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    ExpiredToken,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Authorization required"),
            AuthError::InvalidToken => write!(f, "Invalid authorization"),
            AuthError::ExpiredToken => write!(f, "Token expired"),
        }
    }
}

impl std::error::Error for AuthError {}

/// API authentication manager
#[derive(Clone)]
pub struct ApiAuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    /// Access token expiry (seconds)
    access_token_expiry: i64,
}

impl ApiAuthManager {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expiry: 3600,
        }
    }

    pub fn with_token_expiry(mut self, access_expiry: i64) -> Self {
        self.access_token_expiry = access_expiry;
        self
    }

    /// Issue an access token (used by tooling and tests)
    pub fn generate_token(&self, user_id: Uuid, email: Option<String>) -> Result<String, AuthError> {
        let claims = TokenClaims::new(user_id, email, self.access_token_expiry);
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| AuthError::InvalidToken)
    }

    /// Verify and decode a JWT
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;

        decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                _ => AuthError::InvalidToken,
            })
    }

    /// Authenticate the value of an `Authorization` header
    pub fn authenticate_header(&self, header: Option<&str>) -> Result<AuthContext, AuthError> {
        let token = header
            .and_then(extract_bearer)
            .ok_or(AuthError::MissingToken)?;

        let claims = self.verify_token(token)?;
        Ok(AuthContext {
            user_id: claims.sub,
            email: claims.email,
        })
    }
}

/// Token part of a `Bearer <token>` header value
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
