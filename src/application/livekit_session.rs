//! Browser-call room tokens
//!
//! Issues a room-join token for the signed-in user and, when the call is
//! about a lead, opens the call log that the finalizer will later resolve by
//! room name.

use crate::domain::api_auth::AuthContext;
use crate::domain::call_log::{CallLog, CallLogRepository};
use crate::domain::livekit::{participant_identity, LiveKitTokenIssuer};
use crate::domain::shared::{CallLogId, DomainError, Result};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct RoomTokenCommand {
    pub room_name: String,
    pub lead_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoomToken {
    pub token: String,
    /// Server URL the client connects to
    pub url: String,
    pub room_name: String,
    pub participant_identity: String,
    pub participant_name: String,
    pub call_log_id: Option<CallLogId>,
}

pub struct LiveKitSessionService {
    issuer: Option<LiveKitTokenIssuer>,
    url: String,
    call_logs: Arc<dyn CallLogRepository>,
}

impl LiveKitSessionService {
    /// `issuer` is `None` when LiveKit is not configured
    pub fn new(issuer: Option<LiveKitTokenIssuer>, url: &str, call_logs: Arc<dyn CallLogRepository>) -> Self {
        Self {
            issuer,
            url: url.to_string(),
            call_logs,
        }
    }

    pub async fn issue(&self, auth: &AuthContext, command: RoomTokenCommand) -> Result<RoomToken> {
        let issuer = self
            .issuer
            .as_ref()
            .ok_or_else(|| DomainError::Internal("LiveKit is not configured".to_string()))?;

        let room_name = command.room_name.trim().to_string();
        let identity = participant_identity(auth.user_id);
        let name = auth.display_name();
        let token = issuer.issue_room_token(&room_name, &identity, &name)?;

        let call_log_id = match command.lead_id {
            Some(lead_id) => {
                let log = CallLog::new(auth.user_id, lead_id, command.campaign_id)
                    .with_room_name(room_name.clone());
                match self.call_logs.create(&log).await {
                    Ok(()) => Some(log.id),
                    Err(e) => {
                        warn!(room_name = %room_name, error = %e, "Failed to open call log for room");
                        None
                    }
                }
            }
            None => None,
        };

        info!(room_name = %room_name, identity = %identity, "Room token issued");

        Ok(RoomToken {
            token,
            url: self.url.clone(),
            room_name,
            participant_identity: identity,
            participant_name: name,
            call_log_id,
        })
    }
}
