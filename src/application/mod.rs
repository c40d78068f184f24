//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Coordinating the session, call log and routing stores
//! - Talking to the telephony provider
//! - Turning routing decisions into TwiML documents

pub mod call_finalizer;
pub mod call_initiator;
pub mod inbound_router;
pub mod livekit_session;
pub mod prompts;
pub mod routing_settings;
pub mod status_callback;
pub mod voice_webhook;

pub use call_finalizer::{CallFinalizer, FinalizeCallCommand, FinalizeResult};
pub use call_initiator::{CallInitiator, StartCallCommand, StartedCall};
pub use inbound_router::{InboundCall, InboundCallRouter};
pub use livekit_session::{LiveKitSessionService, RoomToken, RoomTokenCommand};
pub use routing_settings::RoutingSettingsService;
pub use status_callback::{StatusCallback, StatusCallbackHandler};
pub use voice_webhook::VoiceWebhookResponder;

/// Append `key=value` to a URL that may already carry a query string
pub(crate) fn with_query(url: &str, key: &str, value: &str) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}{}={}", url, separator, key, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_query() {
        assert_eq!(
            with_query("wss://m.example.com/stream", "sessionId", "abc"),
            "wss://m.example.com/stream?sessionId=abc"
        );
        assert_eq!(
            with_query("https://ai.example.com/voice?v=2", "sessionId", "abc"),
            "https://ai.example.com/voice?v=2&sessionId=abc"
        );
    }
}
