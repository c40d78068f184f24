//! Configuration management
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `BEAVY__SECTION__KEY` environment variables.

use serde::{Deserialize, Serialize};

/// Default location of the optional configuration file (without extension)
pub const DEFAULT_CONFIG_FILE: &str = "config/beavy";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub telephony: TelephonyConfig,
    pub webhooks: WebhookConfig,
    pub auth: AuthConfig,
    pub livekit: LiveKitConfig,
    pub business_hours: BusinessHoursConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

/// Telephony provider (Twilio) credentials and call defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelephonyConfig {
    pub account_sid: String,
    pub auth_token: String,
    /// Caller ID used for outbound calls
    pub from_number: String,
    pub api_base_url: String,
    /// Language attribute for spoken prompts
    pub language: String,
    pub request_timeout_secs: u64,
    /// Verify `X-Twilio-Signature` on provider-facing webhooks
    pub validate_signatures: bool,
}

/// Public URLs handed to the provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Externally reachable base URL of this service
    pub public_base_url: String,
    /// Bidirectional media stream endpoint (wss://)
    pub media_stream_url: String,
    /// Speech-gathering endpoint of the AI voice agent
    pub ai_voice_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveKitConfig {
    pub url: String,
    pub api_key: String,
    pub api_secret: String,
    pub token_ttl_secs: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessHoursConfig {
    /// Offset of the local business clock from UTC, in minutes
    pub utc_offset_minutes: i32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://postgres@localhost/beavy".to_string(),
            max_connections: 10,
            min_connections: 2,
        }
    }
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            account_sid: String::new(),
            auth_token: String::new(),
            from_number: String::new(),
            api_base_url: "https://api.twilio.com".to_string(),
            language: "de-DE".to_string(),
            request_timeout_secs: 15,
            validate_signatures: false,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            public_base_url: "http://localhost:8080".to_string(),
            media_stream_url: "wss://localhost:8080/media-stream".to_string(),
            ai_voice_url: "http://localhost:8080/ai-voice".to_string(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me".to_string(),
        }
    }
}

impl Default for LiveKitConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            api_key: String::new(),
            api_secret: String::new(),
            token_ttl_secs: 3600,
        }
    }
}

impl TelephonyConfig {
    /// Whether outbound calling can be attempted at all
    pub fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

impl LiveKitConfig {
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() && !self.api_key.is_empty() && !self.api_secret.is_empty()
    }
}

impl Config {
    /// Load from the default file location and the environment
    pub fn load() -> Result<Self, ::config::ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    pub fn load_from(path: &str) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::File::with_name(path).required(false))
            .add_source(
                // Values stay strings so E.164 numbers keep their leading '+'
                ::config::Environment::with_prefix("BEAVY").separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
