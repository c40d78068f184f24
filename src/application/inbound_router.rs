//! Inbound call routing
//!
//! Dialed number → routing rule → business hours → lead → session → TwiML.
//! Every failure ends in a spoken apology; the provider never sees an HTTP
//! error from here.

use super::prompts;
use super::with_query;
use crate::domain::lead::{Lead, LeadRepository};
use crate::domain::routing::{PhoneNumberRoute, RoutingRepository, RoutingType};
use crate::domain::session::{CallSession, CallSessionRepository, SessionContext};
use crate::domain::shared::{CallSid, Clock, DomainError, Result};
use crate::infrastructure::protocols::twiml::{Gather, VoiceResponse};
use chrono::{FixedOffset, Offset, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Voicemail recording limit
pub const VOICEMAIL_MAX_LENGTH_SECS: u32 = 120;

/// Speech gather timeout for the AI agent
pub const GATHER_TIMEOUT_SECS: u32 = 5;

/// Form fields the provider posts for an incoming call
#[derive(Debug, Clone, Default)]
pub struct InboundCall {
    pub call_sid: Option<String>,
    /// Caller number
    pub from: String,
    /// Dialed number
    pub to: String,
    pub call_status: Option<String>,
}

pub struct InboundCallRouter {
    routing: Arc<dyn RoutingRepository>,
    leads: Arc<dyn LeadRepository>,
    sessions: Arc<dyn CallSessionRepository>,
    clock: Arc<dyn Clock>,
    business_offset: FixedOffset,
    language: String,
    ai_voice_url: String,
}

impl InboundCallRouter {
    pub fn new(
        routing: Arc<dyn RoutingRepository>,
        leads: Arc<dyn LeadRepository>,
        sessions: Arc<dyn CallSessionRepository>,
        clock: Arc<dyn Clock>,
        utc_offset_minutes: i32,
        language: &str,
        ai_voice_url: &str,
    ) -> Self {
        let business_offset = FixedOffset::east_opt(utc_offset_minutes * 60).unwrap_or_else(|| {
            warn!(utc_offset_minutes, "Invalid business-hours offset, using UTC");
            Utc.fix()
        });

        Self {
            routing,
            leads,
            sessions,
            clock,
            business_offset,
            language: language.to_string(),
            ai_voice_url: ai_voice_url.to_string(),
        }
    }

    /// Route an incoming call
    pub async fn route(&self, call: &InboundCall) -> VoiceResponse {
        match self.try_route(call).await {
            Ok(response) => response,
            Err(e) => {
                error!(
                    call_sid = ?call.call_sid,
                    to = %call.to,
                    error = %e,
                    "Inbound routing failed"
                );
                metrics::counter!("beavy_webhook_fallbacks_total", "webhook" => "inbound")
                    .increment(1);
                VoiceResponse::apology(&self.language)
            }
        }
    }

    async fn try_route(&self, call: &InboundCall) -> Result<VoiceResponse> {
        let dialed = call.to.trim();
        let Some(route) = self.routing.find_route(dialed).await? else {
            warn!(to = dialed, "Inbound call to unconfigured number");
            return Ok(VoiceResponse::say_and_hangup(
                prompts::NUMBER_NOT_CONFIGURED,
                &self.language,
            ));
        };

        if let Some(rule) = route.active_rule() {
            let local_time = self
                .clock
                .now()
                .with_timezone(&self.business_offset)
                .time();
            if !rule.business_hours.accepts(local_time) {
                info!(to = dialed, %local_time, "Inbound call outside business hours");
                return Ok(VoiceResponse::say_and_hangup(
                    prompts::OUTSIDE_BUSINESS_HOURS,
                    &self.language,
                ));
            }
        }

        let lead = self.find_lead(&route, call.from.trim()).await;
        let session = self.open_session(&route, call, lead.as_ref()).await;

        let routing_type = route.routing_type();
        metrics::counter!("beavy_inbound_calls_total", "routing_type" => routing_type.as_str())
            .increment(1);
        info!(
            to = dialed,
            session_id = %session.id,
            routing_type = routing_type.as_str(),
            "Routing inbound call"
        );

        let greeting = route.active_rule().and_then(|r| r.greeting());
        match routing_type {
            RoutingType::Forward => {
                let target = route
                    .active_rule()
                    .and_then(|r| r.forward_to.as_deref())
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| {
                        DomainError::ValidationError("forward rule without target".to_string())
                    })?;
                Ok(VoiceResponse::new()
                    .say(greeting.unwrap_or(prompts::FORWARD_GREETING), &self.language)
                    .dial(target))
            }
            RoutingType::Voicemail => Ok(VoiceResponse::new()
                .say(greeting.unwrap_or(prompts::VOICEMAIL_GREETING), &self.language)
                .record(VOICEMAIL_MAX_LENGTH_SECS, true)),
            RoutingType::AiAgent => {
                let greeting = match (greeting, &lead) {
                    (Some(greeting), _) => greeting.to_string(),
                    (None, Some(lead)) => prompts::ai_greeting_for(&lead.first_name),
                    (None, None) => prompts::AI_GREETING_ANONYMOUS.to_string(),
                };
                Ok(VoiceResponse::new()
                    .say(&greeting, &self.language)
                    .gather(Gather {
                        input: "speech".to_string(),
                        language: self.language.clone(),
                        timeout_secs: GATHER_TIMEOUT_SECS,
                        action: with_query(&self.ai_voice_url, "sessionId", &session.id.to_string()),
                        prompt: Some(prompts::GATHER_PROMPT.to_string()),
                    }))
            }
        }
    }

    /// Lead lookup is best effort
    async fn find_lead(&self, route: &PhoneNumberRoute, caller: &str) -> Option<Lead> {
        if caller.is_empty() {
            return None;
        }
        match self.leads.find_by_phone(route.number.user_id, caller).await {
            Ok(lead) => lead,
            Err(e) => {
                warn!(error = %e, "Lead lookup failed, continuing without lead");
                None
            }
        }
    }

    /// Persist the session; a store failure is logged and routing continues
    async fn open_session(
        &self,
        route: &PhoneNumberRoute,
        call: &InboundCall,
        lead: Option<&Lead>,
    ) -> CallSession {
        let rule = route.active_rule();
        let context = SessionContext {
            lead_id: lead.map(|l| l.id),
            campaign_id: route
                .number
                .campaign_id
                .or_else(|| rule.and_then(|r| r.campaign_id)),
            campaign_prompt: rule
                .and_then(|r| r.greeting())
                .unwrap_or(prompts::DEFAULT_CAMPAIGN_PROMPT)
                .to_string(),
            lead_name: lead
                .map(Lead::display_name)
                .unwrap_or_else(|| prompts::UNKNOWN_CALLER.to_string()),
            lead_company: lead.and_then(|l| l.company.clone()).unwrap_or_default(),
        };

        let session = match call.call_sid.as_deref().filter(|s| !s.is_empty()) {
            Some(sid) => CallSession::for_provider_call(route.number.user_id, CallSid::new(sid), context),
            None => CallSession::new(route.number.user_id, context),
        };

        if let Err(e) = self.sessions.create(&session).await {
            warn!(session_id = %session.id, error = %e, "Failed to store inbound session");
        }
        session
    }
}
