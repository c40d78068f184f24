//! Outbound call origination
//!
//! The session is written before the provider is contacted so that the
//! provider's first webhook always finds it.

use super::with_query;
use crate::domain::call_log::{CallLog, CallLogRepository};
use crate::domain::session::{CallSession, CallSessionRepository, SessionContext};
use crate::domain::shared::{CallLogId, CallSid, DomainError, Result, SessionId};
use crate::domain::telephony::{OutboundCallRequest, TelephonyProvider};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Caller-supplied call parameters
#[derive(Debug, Clone, Default)]
pub struct StartCallCommand {
    pub to: String,
    pub campaign_prompt: Option<String>,
    pub lead_name: Option<String>,
    pub lead_company: Option<String>,
    pub lead_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StartedCall {
    pub call_sid: CallSid,
    /// Provider status at creation time
    pub status: String,
    pub session_id: SessionId,
    pub call_log_id: Option<CallLogId>,
}

pub struct CallInitiator {
    sessions: Arc<dyn CallSessionRepository>,
    call_logs: Arc<dyn CallLogRepository>,
    provider: Arc<dyn TelephonyProvider>,
    public_base_url: String,
}

impl CallInitiator {
    pub fn new(
        sessions: Arc<dyn CallSessionRepository>,
        call_logs: Arc<dyn CallLogRepository>,
        provider: Arc<dyn TelephonyProvider>,
        public_base_url: &str,
    ) -> Self {
        Self {
            sessions,
            call_logs,
            provider,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// URL the provider fetches once the callee answers. Carries only the
    /// session id.
    pub fn answer_url(&self, session_id: SessionId) -> String {
        with_query(
            &format!("{}/twilio/voice", self.public_base_url),
            "sessionId",
            &session_id.to_string(),
        )
    }

    pub fn status_callback_url(&self) -> String {
        format!("{}/twilio/status", self.public_base_url)
    }

    pub async fn start_call(&self, user_id: Uuid, command: StartCallCommand) -> Result<StartedCall> {
        let to = command.to.trim();
        if to.is_empty() {
            return Err(DomainError::ValidationError(
                "Missing 'to' phone number".to_string(),
            ));
        }

        let session = CallSession::new(
            user_id,
            SessionContext {
                lead_id: command.lead_id,
                campaign_id: command.campaign_id,
                campaign_prompt: command.campaign_prompt.unwrap_or_default(),
                lead_name: command.lead_name.unwrap_or_default(),
                lead_company: command.lead_company.unwrap_or_default(),
            },
        );
        self.sessions.create(&session).await.map_err(|e| {
            error!(user_id = %user_id, error = %e, "Failed to create call session");
            e
        })?;

        let request = OutboundCallRequest {
            to: to.to_string(),
            answer_url: self.answer_url(session.id),
            status_callback_url: self.status_callback_url(),
        };

        let call = match self.provider.originate_call(&request).await {
            Ok(call) => call,
            Err(e) => {
                metrics::counter!("beavy_provider_failures_total").increment(1);
                warn!(session_id = %session.id, error = %e, "Provider did not accept the call");
                return Err(e);
            }
        };

        self.sessions.attach_call_sid(session.id, &call.sid).await?;

        let call_log_id = match command.lead_id {
            Some(lead_id) => {
                let log = CallLog::new(user_id, lead_id, command.campaign_id)
                    .with_call_sid(call.sid.clone());
                match self.call_logs.create(&log).await {
                    Ok(()) => Some(log.id),
                    Err(e) => {
                        warn!(call_sid = %call.sid, error = %e, "Failed to open call log");
                        None
                    }
                }
            }
            None => None,
        };

        metrics::counter!("beavy_calls_started_total").increment(1);
        info!(
            session_id = %session.id,
            call_sid = %call.sid,
            status = %call.status,
            "Outbound call started"
        );

        Ok(StartedCall {
            call_sid: call.sid,
            status: call.status,
            session_id: session.id,
            call_log_id,
        })
    }
}
