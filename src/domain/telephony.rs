//! Telephony provider port

use super::shared::{CallSid, Result};
use serde::{Deserialize, Serialize};

/// Events for which the provider reports call status changes
pub const STATUS_CALLBACK_EVENTS: &str = "initiated ringing answered completed";

/// Request to originate an outbound call
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundCallRequest {
    /// Destination number
    pub to: String,
    /// URL the provider fetches when the callee answers
    pub answer_url: String,
    /// URL receiving status-change callbacks
    pub status_callback_url: String,
}

/// Call accepted by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginatedCall {
    pub sid: CallSid,
    /// Provider status at creation time, e.g. "queued"
    pub status: String,
}

/// Outbound call origination
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Ask the provider to place a call. Rejections map to `DomainError::Upstream`.
    async fn originate_call(&self, request: &OutboundCallRequest) -> Result<OriginatedCall>;
}
