//! Twilio REST client for outbound calls

use crate::config::TelephonyConfig;
use crate::domain::shared::{CallSid, DomainError, Result};
use crate::domain::telephony::{
    OriginatedCall, OutboundCallRequest, TelephonyProvider, STATUS_CALLBACK_EVENTS,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
struct CreateCallResponse {
    sid: String,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Error for a non-2xx provider response: the provider's message and code
/// when the body carries them, the HTTP status otherwise
fn rejection_error(status: reqwest::StatusCode, body: &str) -> DomainError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| {
            e.message.map(|m| match e.code {
                Some(code) => format!("{} (code {})", m, code),
                None => m,
            })
        })
        .unwrap_or_else(|| format!("provider returned HTTP {}", status.as_u16()));
    DomainError::Upstream(message)
}

/// Places calls through the Twilio Calls API
#[derive(Clone)]
pub struct TwilioClient {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base_url: String,
}

impl TwilioClient {
    pub fn new(config: &TelephonyConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| DomainError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            account_sid: config.account_sid.clone(),
            auth_token: config.auth_token.clone(),
            from_number: config.from_number.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls.json",
            self.api_base_url, self.account_sid
        )
    }

    fn is_configured(&self) -> bool {
        !self.account_sid.is_empty() && !self.auth_token.is_empty() && !self.from_number.is_empty()
    }
}

#[async_trait]
impl TelephonyProvider for TwilioClient {
    async fn originate_call(&self, request: &OutboundCallRequest) -> Result<OriginatedCall> {
        if !self.is_configured() {
            return Err(DomainError::Internal(
                "telephony credentials are not configured".to_string(),
            ));
        }

        let form = [
            ("To", request.to.as_str()),
            ("From", self.from_number.as_str()),
            ("Url", request.answer_url.as_str()),
            ("StatusCallback", request.status_callback_url.as_str()),
            ("StatusCallbackEvent", STATUS_CALLBACK_EVENTS),
        ];

        let response = self
            .http
            .post(self.calls_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Call request did not reach the provider");
                DomainError::Upstream(format!("telephony request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DomainError::Upstream(format!("unreadable provider response: {}", e)))?;

        if !status.is_success() {
            let err = rejection_error(status, &body);
            error!(status = status.as_u16(), error = %err, "Provider rejected call");
            return Err(err);
        }

        let created: CreateCallResponse = serde_json::from_str(&body)
            .map_err(|e| DomainError::Upstream(format!("unexpected provider response: {}", e)))?;

        info!(call_sid = %created.sid, status = %created.status, "Outbound call created");

        Ok(OriginatedCall {
            sid: CallSid::new(created.sid),
            status: created.status,
        })
    }
}
