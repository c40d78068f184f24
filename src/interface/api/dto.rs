//! API DTOs

use crate::application::{FinalizeCallCommand, RoomToken, StartCallCommand, StartedCall};
use crate::domain::call_log::CallLog;
use crate::domain::routing::{parse_clock_time, InboundRoutingRule, RoutingRuleUpdate, RoutingType};
use crate::domain::shared::{CallLogId, DomainError, Result};
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
fn double_option<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Start call request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest {
    pub to: Option<String>,
    pub campaign_prompt: Option<String>,
    pub lead_name: Option<String>,
    pub lead_company: Option<String>,
    pub lead_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
}

impl From<StartCallRequest> for StartCallCommand {
    fn from(req: StartCallRequest) -> Self {
        StartCallCommand {
            to: req.to.unwrap_or_default(),
            campaign_prompt: req.campaign_prompt,
            lead_name: req.lead_name,
            lead_company: req.lead_company,
            lead_id: req.lead_id,
            campaign_id: req.campaign_id,
        }
    }
}

/// Start call response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallResponse {
    pub success: bool,
    pub call_sid: String,
    pub status: String,
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_log_id: Option<CallLogId>,
}

impl From<StartedCall> for StartCallResponse {
    fn from(call: StartedCall) -> Self {
        StartCallResponse {
            success: true,
            call_sid: call.call_sid.to_string(),
            status: call.status,
            session_id: call.session_id.to_string(),
            call_log_id: call.call_log_id,
        }
    }
}

/// End call request
#[derive(Debug, Default, Deserialize)]
pub struct EndCallRequest {
    pub call_log_id: Option<Uuid>,
    pub room_name: Option<String>,
    pub duration_seconds: Option<i64>,
    pub outcome: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub idempotency_key: Option<String>,
}

impl From<EndCallRequest> for FinalizeCallCommand {
    fn from(req: EndCallRequest) -> Self {
        FinalizeCallCommand {
            call_log_id: req.call_log_id.map(CallLogId::from_uuid),
            room_name: req.room_name,
            duration_seconds: req.duration_seconds,
            outcome: req.outcome,
            summary: req.summary,
            transcript: req.transcript,
            idempotency_key: req.idempotency_key,
        }
    }
}

/// End call response
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct EndCallResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_log_id: Option<CallLogId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub already_applied: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EndCallResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// Call log response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallLogResponse {
    pub id: CallLogId,
    pub lead_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub provider_call_sid: Option<String>,
    pub room_name: Option<String>,
    pub duration_seconds: Option<i32>,
    pub outcome: Option<String>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<CallLog> for CallLogResponse {
    fn from(log: CallLog) -> Self {
        CallLogResponse {
            id: log.id,
            lead_id: log.lead_id,
            campaign_id: log.campaign_id,
            provider_call_sid: log.provider_call_sid.map(|s| s.to_string()),
            room_name: log.room_name,
            duration_seconds: log.duration_seconds,
            outcome: log.outcome.map(|o| o.as_str().to_string()),
            transcript: log.transcript,
            summary: log.summary,
            started_at: log.started_at,
            ended_at: log.ended_at,
        }
    }
}

/// Call log list response
#[derive(Debug, Serialize, Deserialize)]
pub struct CallLogListResponse {
    pub call_logs: Vec<CallLogResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Routing rule upsert request; omitted fields keep their stored value
#[derive(Debug, Default, Deserialize)]
pub struct RoutingRuleRequest {
    pub routing_type: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub forward_to: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ai_greeting: Option<Option<String>>,
    pub business_hours_only: Option<bool>,
    pub business_hours_start: Option<String>,
    pub business_hours_end: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub campaign_id: Option<Option<Uuid>>,
}

impl RoutingRuleRequest {
    pub fn into_update(self) -> Result<RoutingRuleUpdate> {
        let routing_type = self
            .routing_type
            .map(|value| {
                RoutingType::from_str(&value).ok_or_else(|| {
                    DomainError::ValidationError(format!("Invalid routing_type: {}", value))
                })
            })
            .transpose()?;

        Ok(RoutingRuleUpdate {
            routing_type,
            forward_to: self.forward_to,
            ai_greeting: self.ai_greeting,
            business_hours_only: self.business_hours_only,
            business_hours_start: self
                .business_hours_start
                .as_deref()
                .map(parse_clock_time)
                .transpose()?,
            business_hours_end: self
                .business_hours_end
                .as_deref()
                .map(parse_clock_time)
                .transpose()?,
            is_active: self.is_active,
            campaign_id: self.campaign_id,
        })
    }
}

fn clock_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Routing rule response
#[derive(Debug, Serialize, Deserialize)]
pub struct RoutingRuleResponse {
    pub id: Uuid,
    pub phone_number_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub routing_type: String,
    pub forward_to: Option<String>,
    pub ai_greeting: Option<String>,
    pub business_hours_only: bool,
    pub business_hours_start: String,
    pub business_hours_end: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<InboundRoutingRule> for RoutingRuleResponse {
    fn from(rule: InboundRoutingRule) -> Self {
        RoutingRuleResponse {
            id: rule.id,
            phone_number_id: rule.phone_number_id,
            campaign_id: rule.campaign_id,
            routing_type: rule.routing_type.as_str().to_string(),
            forward_to: rule.forward_to,
            ai_greeting: rule.ai_greeting,
            business_hours_only: rule.business_hours.only,
            business_hours_start: clock_time(rule.business_hours.start),
            business_hours_end: clock_time(rule.business_hours.end),
            is_active: rule.is_active,
            created_at: rule.created_at,
            updated_at: rule.updated_at,
        }
    }
}

/// Room token request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTokenRequest {
    pub room_name: Option<String>,
    pub lead_id: Option<Uuid>,
    pub campaign_id: Option<Uuid>,
}

/// Room token response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomTokenResponse {
    pub token: String,
    pub url: String,
    pub room_name: String,
    pub participant_identity: String,
    pub participant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call_log_id: Option<CallLogId>,
}

impl From<RoomToken> for RoomTokenResponse {
    fn from(token: RoomToken) -> Self {
        RoomTokenResponse {
            token: token.token,
            url: token.url,
            room_name: token.room_name,
            participant_identity: token.participant_identity,
            participant_name: token.participant_name,
            call_log_id: token.call_log_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_call_request_is_camel_case() {
        let req: StartCallRequest = serde_json::from_str(
            r#"{"to": "+4917012345", "leadName": "Anna", "campaignPrompt": "Hallo"}"#,
        )
        .unwrap();

        let command = StartCallCommand::from(req);
        assert_eq!(command.to, "+4917012345");
        assert_eq!(command.lead_name.as_deref(), Some("Anna"));
        assert_eq!(command.campaign_prompt.as_deref(), Some("Hallo"));
    }

    #[test]
    fn test_routing_request_distinguishes_null_from_absent() {
        let cleared: RoutingRuleRequest =
            serde_json::from_str(r#"{"ai_greeting": null}"#).unwrap();
        let untouched: RoutingRuleRequest = serde_json::from_str(r#"{}"#).unwrap();

        assert_eq!(cleared.into_update().unwrap().ai_greeting, Some(None));
        assert_eq!(untouched.into_update().unwrap().ai_greeting, None);
    }

    #[test]
    fn test_routing_request_parses_times_and_type() {
        let req: RoutingRuleRequest = serde_json::from_str(
            r#"{"routing_type": "voicemail", "business_hours_start": "08:30", "business_hours_end": "17:00:00"}"#,
        )
        .unwrap();
        let update = req.into_update().unwrap();

        assert_eq!(update.routing_type, Some(RoutingType::Voicemail));
        assert_eq!(update.business_hours_start, NaiveTime::from_hms_opt(8, 30, 0));
        assert_eq!(update.business_hours_end, NaiveTime::from_hms_opt(17, 0, 0));
    }

    #[test]
    fn test_routing_request_rejects_unknown_type() {
        let req: RoutingRuleRequest =
            serde_json::from_str(r#"{"routing_type": "ivr"}"#).unwrap();
        assert!(matches!(req.into_update(), Err(DomainError::ValidationError(_))));
    }

    #[test]
    fn test_end_call_response_omits_empty_fields() {
        let json = serde_json::to_value(EndCallResponse::failure("Call log not found")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Call log not found");
        assert!(json.get("call_log_id").is_none());
    }
}
