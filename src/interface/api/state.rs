//! Shared handler state

use crate::application::{
    CallFinalizer, CallInitiator, InboundCallRouter, LiveKitSessionService,
    RoutingSettingsService, StatusCallbackHandler, VoiceWebhookResponder,
};
use crate::config::Config;
use crate::domain::api_auth::ApiAuthManager;
use crate::domain::call_log::CallLogRepository;
use crate::domain::lead::LeadRepository;
use crate::domain::livekit::LiveKitTokenIssuer;
use crate::domain::routing::RoutingRepository;
use crate::domain::session::CallSessionRepository;
use crate::domain::shared::Clock;
use crate::domain::telephony::TelephonyProvider;
use crate::infrastructure::persistence::InMemoryStore;
use crate::infrastructure::telephony::WebhookVerifier;
use std::sync::Arc;

/// Store ports the services are wired to
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn CallSessionRepository>,
    pub call_logs: Arc<dyn CallLogRepository>,
    pub routing: Arc<dyn RoutingRepository>,
    pub leads: Arc<dyn LeadRepository>,
}

impl Stores {
    /// All ports backed by one in-memory store
    pub fn in_memory(store: InMemoryStore) -> Self {
        Self {
            sessions: Arc::new(store.clone()),
            call_logs: Arc::new(store.clone()),
            routing: Arc::new(store.clone()),
            leads: Arc::new(store),
        }
    }
}

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub call_initiator: Arc<CallInitiator>,
    pub voice_webhook: Arc<VoiceWebhookResponder>,
    pub inbound_router: Arc<InboundCallRouter>,
    pub call_finalizer: Arc<CallFinalizer>,
    pub status_callbacks: Arc<StatusCallbackHandler>,
    pub routing_settings: Arc<RoutingSettingsService>,
    pub livekit: Arc<LiveKitSessionService>,
    pub call_logs: Arc<dyn CallLogRepository>,
    pub auth: Arc<ApiAuthManager>,
    /// Set when provider webhook signatures must be checked
    pub webhook_verifier: Option<Arc<WebhookVerifier>>,
    pub language: String,
}

impl AppState {
    pub fn new(
        config: &Config,
        stores: Stores,
        provider: Arc<dyn TelephonyProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let telephony = &config.telephony;
        let webhooks = &config.webhooks;

        let livekit_issuer = config.livekit.is_configured().then(|| {
            LiveKitTokenIssuer::new(
                &config.livekit.api_key,
                &config.livekit.api_secret,
                config.livekit.token_ttl_secs,
            )
        });

        let webhook_verifier = telephony.validate_signatures.then(|| {
            Arc::new(WebhookVerifier::new(
                &telephony.auth_token,
                &webhooks.public_base_url,
            ))
        });

        Self {
            call_initiator: Arc::new(CallInitiator::new(
                stores.sessions.clone(),
                stores.call_logs.clone(),
                provider,
                &webhooks.public_base_url,
            )),
            voice_webhook: Arc::new(VoiceWebhookResponder::new(
                stores.sessions.clone(),
                &webhooks.media_stream_url,
                &telephony.language,
            )),
            inbound_router: Arc::new(InboundCallRouter::new(
                stores.routing.clone(),
                stores.leads.clone(),
                stores.sessions.clone(),
                clock.clone(),
                config.business_hours.utc_offset_minutes,
                &telephony.language,
                &webhooks.ai_voice_url,
            )),
            call_finalizer: Arc::new(CallFinalizer::new(stores.call_logs.clone(), clock.clone())),
            status_callbacks: Arc::new(StatusCallbackHandler::new(
                stores.call_logs.clone(),
                clock,
            )),
            routing_settings: Arc::new(RoutingSettingsService::new(stores.routing.clone())),
            livekit: Arc::new(LiveKitSessionService::new(
                livekit_issuer,
                &config.livekit.url,
                stores.call_logs.clone(),
            )),
            call_logs: stores.call_logs,
            auth: Arc::new(ApiAuthManager::new(&config.auth.jwt_secret)),
            webhook_verifier,
            language: telephony.language.clone(),
        }
    }
}
