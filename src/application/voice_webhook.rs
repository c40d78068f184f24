//! Answer webhook for outbound calls

use super::with_query;
use crate::domain::session::CallSessionRepository;
use crate::domain::shared::SessionId;
use crate::infrastructure::protocols::twiml::{Stream, VoiceResponse};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Connects an answered call to the media stream of its session
pub struct VoiceWebhookResponder {
    sessions: Arc<dyn CallSessionRepository>,
    media_stream_url: String,
    language: String,
}

impl VoiceWebhookResponder {
    pub fn new(sessions: Arc<dyn CallSessionRepository>, media_stream_url: &str, language: &str) -> Self {
        Self {
            sessions,
            media_stream_url: media_stream_url.to_string(),
            language: language.to_string(),
        }
    }

    pub fn apology(&self) -> VoiceResponse {
        metrics::counter!("beavy_webhook_fallbacks_total", "webhook" => "voice").increment(1);
        VoiceResponse::apology(&self.language)
    }

    /// Document for the `sessionId` query value. Never fails: every problem
    /// yields the apology document.
    pub async fn respond(&self, session_id: Option<&str>) -> VoiceResponse {
        let Some(raw) = session_id.filter(|s| !s.trim().is_empty()) else {
            warn!("Voice webhook called without a session id");
            return self.apology();
        };

        let id: SessionId = match raw.parse() {
            Ok(id) => id,
            Err(_) => {
                warn!(session_id = raw, "Voice webhook called with a malformed session id");
                return self.apology();
            }
        };

        match self.sessions.find_by_id(id).await {
            Ok(Some(session)) => {
                debug!(session_id = %session.id, "Connecting call to media stream");
                let session_id = session.id.to_string();
                VoiceResponse::new().connect(
                    Stream::new(with_query(&self.media_stream_url, "sessionId", &session_id))
                        .parameter("sessionId", session_id),
                )
            }
            Ok(None) => {
                warn!(session_id = %id, "Voice webhook for unknown session");
                self.apology()
            }
            Err(e) => {
                error!(session_id = %id, error = %e, "Session lookup failed");
                self.apology()
            }
        }
    }
}
