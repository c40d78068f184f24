//! Call session domain model
//!
//! A session correlates one telephony call leg with the application context
//! (lead, campaign script) the voice agent needs once media starts flowing.
//! Only the session id ever travels through provider-facing URLs.

use super::shared::{CallSid, DomainError, Result, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Call session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSession {
    pub id: SessionId,
    /// Owning user
    pub user_id: Uuid,
    pub lead_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    /// Script / system prompt for the voice agent
    pub campaign_prompt: String,
    pub lead_name: String,
    pub lead_company: String,
    /// Set once the provider accepted the call
    pub call_sid: Option<CallSid>,
    pub created_at: DateTime<Utc>,
}

/// Context captured when a session is opened
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub lead_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
    pub campaign_prompt: String,
    pub lead_name: String,
    pub lead_company: String,
}

impl CallSession {
    pub fn new(user_id: Uuid, context: SessionContext) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            lead_id: context.lead_id,
            campaign_id: context.campaign_id,
            campaign_prompt: context.campaign_prompt,
            lead_name: context.lead_name,
            lead_company: context.lead_company,
            call_sid: None,
            created_at: Utc::now(),
        }
    }

    /// Session for a call the provider already identified (inbound legs)
    pub fn for_provider_call(user_id: Uuid, call_sid: CallSid, context: SessionContext) -> Self {
        let mut session = Self::new(user_id, context);
        session.call_sid = Some(call_sid);
        session
    }

    /// Link the provider call identifier.
    ///
    /// Re-attaching the same SID is a no-op; a different SID is rejected.
    pub fn attach_call_sid(&mut self, sid: CallSid) -> Result<()> {
        match &self.call_sid {
            Some(existing) if *existing == sid => Ok(()),
            Some(existing) => Err(DomainError::Conflict(format!(
                "session {} is already linked to call {}",
                self.id, existing
            ))),
            None => {
                self.call_sid = Some(sid);
                Ok(())
            }
        }
    }
}

/// Session store port
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CallSessionRepository: Send + Sync {
    /// Persist a new session
    async fn create(&self, session: &CallSession) -> Result<()>;

    /// Get session by ID
    async fn find_by_id(&self, id: SessionId) -> Result<Option<CallSession>>;

    /// Link the provider call SID, honouring the write-once rule
    async fn attach_call_sid(&self, id: SessionId, sid: &CallSid) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> SessionContext {
        SessionContext {
            lead_id: Some(Uuid::new_v4()),
            campaign_id: None,
            campaign_prompt: "Sell widgets".to_string(),
            lead_name: "Anna".to_string(),
            lead_company: "Acme".to_string(),
        }
    }

    #[test]
    fn test_session_creation() {
        let user_id = Uuid::new_v4();
        let session = CallSession::new(user_id, context());

        assert_eq!(session.user_id, user_id);
        assert_eq!(session.lead_name, "Anna");
        assert_eq!(session.campaign_prompt, "Sell widgets");
        assert!(session.call_sid.is_none());
    }

    #[test]
    fn test_attach_call_sid_once() {
        let mut session = CallSession::new(Uuid::new_v4(), context());

        session.attach_call_sid(CallSid::new("CA1")).unwrap();
        assert_eq!(session.call_sid, Some(CallSid::new("CA1")));

        // same SID again is harmless
        session.attach_call_sid(CallSid::new("CA1")).unwrap();

        let err = session.attach_call_sid(CallSid::new("CA2")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(session.call_sid, Some(CallSid::new("CA1")));
    }

    #[test]
    fn test_inbound_session_carries_sid() {
        let session =
            CallSession::for_provider_call(Uuid::new_v4(), CallSid::new("CA9"), context());
        assert_eq!(session.call_sid, Some(CallSid::new("CA9")));
    }
}
