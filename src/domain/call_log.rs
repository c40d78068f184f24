//! Call log domain model
//!
//! The call log is the durable business record of a call. Sessions are
//! routing context; logs carry the outcome, transcript and summary.

use super::shared::{CallLogId, CallSid, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Separator placed between appended summaries
pub const SUMMARY_SEPARATOR: &str = "\n\n";

/// Call log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLog {
    pub id: CallLogId,
    pub user_id: Uuid,
    pub lead_id: Uuid,
    pub campaign_id: Option<Uuid>,

    /// Correlation keys for asynchronous completion events
    pub provider_call_sid: Option<CallSid>,
    pub room_name: Option<String>,

    /// Outcome, filled in by finalization
    pub duration_seconds: Option<i32>,
    pub outcome: Option<CallOutcome>,
    pub transcript: Option<String>,
    pub summary: Option<String>,

    /// Idempotency keys of every applied finalization
    pub finalization_keys: BTreeSet<String>,

    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

/// Business outcome of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    Answered,
    NoAnswer,
    Busy,
    Voicemail,
    Interested,
    NotInterested,
    CallbackScheduled,
    Qualified,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Answered => "answered",
            CallOutcome::NoAnswer => "no_answer",
            CallOutcome::Busy => "busy",
            CallOutcome::Voicemail => "voicemail",
            CallOutcome::Interested => "interested",
            CallOutcome::NotInterested => "not_interested",
            CallOutcome::CallbackScheduled => "callback_scheduled",
            CallOutcome::Qualified => "qualified",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "answered" => Some(CallOutcome::Answered),
            "no_answer" => Some(CallOutcome::NoAnswer),
            "busy" => Some(CallOutcome::Busy),
            "voicemail" => Some(CallOutcome::Voicemail),
            "interested" => Some(CallOutcome::Interested),
            "not_interested" => Some(CallOutcome::NotInterested),
            "callback_scheduled" => Some(CallOutcome::CallbackScheduled),
            "qualified" => Some(CallOutcome::Qualified),
            _ => None,
        }
    }

    /// Outcome implied by a terminal provider call status
    pub fn from_provider_status(status: &str) -> Option<Self> {
        match status {
            "completed" => Some(CallOutcome::Answered),
            "busy" => Some(CallOutcome::Busy),
            "no-answer" | "failed" | "canceled" => Some(CallOutcome::NoAnswer),
            _ => None,
        }
    }
}

/// End-of-call facts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallFinalization {
    pub duration_seconds: Option<i32>,
    pub outcome: Option<CallOutcome>,
    pub transcript: Option<String>,
    pub summary: Option<String>,
    /// Repeated keys are applied once
    pub idempotency_key: Option<String>,
}

/// Result of applying a finalization to a stored log
#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeOutcome {
    Applied(CallLog),
    /// The idempotency key had already been applied; nothing changed
    AlreadyApplied(CallLog),
}

impl FinalizeOutcome {
    pub fn call_log(&self) -> &CallLog {
        match self {
            FinalizeOutcome::Applied(log) | FinalizeOutcome::AlreadyApplied(log) => log,
        }
    }
}

/// Concatenate a summary onto the stored one, never overwriting
pub fn append_summary(existing: Option<&str>, addition: &str) -> String {
    match existing {
        Some(current) if !current.is_empty() => {
            format!("{}{}{}", current, SUMMARY_SEPARATOR, addition)
        }
        _ => addition.to_string(),
    }
}

impl CallLog {
    /// Open a log for a call that is starting now
    pub fn new(user_id: Uuid, lead_id: Uuid, campaign_id: Option<Uuid>) -> Self {
        Self {
            id: CallLogId::new(),
            user_id,
            lead_id,
            campaign_id,
            provider_call_sid: None,
            room_name: None,
            duration_seconds: None,
            outcome: None,
            transcript: None,
            summary: None,
            finalization_keys: BTreeSet::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn with_call_sid(mut self, sid: CallSid) -> Self {
        self.provider_call_sid = Some(sid);
        self
    }

    pub fn with_room_name(mut self, room_name: String) -> Self {
        self.room_name = Some(room_name);
        self
    }

    /// Whether a finalization carrying `key` was already applied
    pub fn has_applied(&self, key: Option<&str>) -> bool {
        match key {
            Some(key) => self.finalization_keys.contains(key),
            None => false,
        }
    }

    /// Apply end-of-call facts. Returns `false` when the idempotency key
    /// was already applied and the log is left untouched.
    pub fn apply_finalization(&mut self, facts: &CallFinalization, ended_at: DateTime<Utc>) -> bool {
        if self.has_applied(facts.idempotency_key.as_deref()) {
            return false;
        }

        self.ended_at = Some(ended_at);

        if let Some(duration) = facts.duration_seconds {
            self.duration_seconds = Some(duration);
        }
        if let Some(outcome) = facts.outcome {
            self.outcome = Some(outcome);
        }
        if let Some(transcript) = &facts.transcript {
            self.transcript = Some(transcript.clone());
        }
        if let Some(summary) = &facts.summary {
            self.summary = Some(append_summary(self.summary.as_deref(), summary));
        }
        if let Some(key) = &facts.idempotency_key {
            self.finalization_keys.insert(key.clone());
        }

        true
    }
}

/// Call log store port
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CallLogRepository: Send + Sync {
    /// Create a new call log
    async fn create(&self, log: &CallLog) -> Result<()>;

    /// Get call log by ID
    async fn find_by_id(&self, id: CallLogId) -> Result<Option<CallLog>>;

    /// Newest log carrying this room name in its correlation column
    async fn find_by_room_name(&self, room_name: &str) -> Result<Option<CallLog>>;

    /// Newest log whose summary contains `fragment`, case-insensitive.
    /// Fallback for logs written before room names had their own column.
    async fn find_latest_by_summary_fragment(&self, fragment: &str) -> Result<Option<CallLog>>;

    /// Newest log linked to a provider call
    async fn find_by_call_sid(&self, sid: &CallSid) -> Result<Option<CallLog>>;

    /// Apply end-of-call facts atomically.
    ///
    /// Fails with `NotFound` if the log does not exist.
    async fn finalize(
        &self,
        id: CallLogId,
        facts: &CallFinalization,
        ended_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome>;

    /// List a user's logs, newest first
    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<CallLog>>;

    /// Count a user's logs
    async fn count_for_user(&self, user_id: Uuid) -> Result<i64>;
}
