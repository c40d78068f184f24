//! End-of-call finalization of call logs

use crate::domain::call_log::{CallFinalization, CallLog, CallLogRepository, CallOutcome, FinalizeOutcome};
use crate::domain::shared::{CallLogId, Clock, DomainError, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// End-of-call facts as reported by the client
#[derive(Debug, Clone, Default)]
pub struct FinalizeCallCommand {
    pub call_log_id: Option<CallLogId>,
    pub room_name: Option<String>,
    pub duration_seconds: Option<i64>,
    pub outcome: Option<String>,
    pub summary: Option<String>,
    pub transcript: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FinalizeResult {
    /// Neither the id nor the room name matched a log
    NotFound,
    Finalized {
        call_log_id: CallLogId,
        already_applied: bool,
    },
}

pub struct CallFinalizer {
    call_logs: Arc<dyn CallLogRepository>,
    clock: Arc<dyn Clock>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CallFinalizer {
    pub fn new(call_logs: Arc<dyn CallLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { call_logs, clock }
    }

    /// Find the log by id, then by room name column, then by the legacy
    /// summary search
    pub async fn resolve(&self, command: &FinalizeCallCommand) -> Result<Option<CallLog>> {
        if let Some(id) = command.call_log_id {
            return self.call_logs.find_by_id(id).await;
        }

        let Some(room_name) = non_blank(&command.room_name) else {
            return Ok(None);
        };

        if let Some(log) = self.call_logs.find_by_room_name(room_name).await? {
            return Ok(Some(log));
        }

        let legacy = self
            .call_logs
            .find_latest_by_summary_fragment(room_name)
            .await?;
        if let Some(log) = &legacy {
            debug!(room_name, call_log_id = %log.id, "Resolved call log by summary text");
        }
        Ok(legacy)
    }

    fn validate(command: &FinalizeCallCommand) -> Result<CallFinalization> {
        let outcome = match non_blank(&command.outcome) {
            Some(value) => Some(CallOutcome::from_str(value).ok_or_else(|| {
                DomainError::ValidationError(format!("Invalid outcome: {}", value))
            })?),
            None => None,
        };

        let duration_seconds = match command.duration_seconds {
            Some(d) if d < 0 => {
                return Err(DomainError::ValidationError(
                    "duration_seconds must not be negative".to_string(),
                ))
            }
            Some(d) => Some(i32::try_from(d).map_err(|_| {
                DomainError::ValidationError("duration_seconds is too large".to_string())
            })?),
            None => None,
        };

        Ok(CallFinalization {
            duration_seconds,
            outcome,
            transcript: command.transcript.clone(),
            summary: non_blank(&command.summary).map(str::to_string),
            idempotency_key: non_blank(&command.idempotency_key).map(str::to_string),
        })
    }

    pub async fn finalize(&self, command: FinalizeCallCommand) -> Result<FinalizeResult> {
        let Some(log) = self.resolve(&command).await? else {
            warn!(
                call_log_id = ?command.call_log_id,
                room_name = ?command.room_name,
                "No call log found to finalize"
            );
            metrics::counter!("beavy_finalizations_total", "result" => "not_found").increment(1);
            return Ok(FinalizeResult::NotFound);
        };

        let facts = Self::validate(&command)?;
        let outcome = self
            .call_logs
            .finalize(log.id, &facts, self.clock.now())
            .await?;

        let already_applied = matches!(outcome, FinalizeOutcome::AlreadyApplied(_));
        let label = if already_applied { "already_applied" } else { "applied" };
        metrics::counter!("beavy_finalizations_total", "result" => label).increment(1);
        info!(call_log_id = %log.id, already_applied, "Call finalized");

        Ok(FinalizeResult::Finalized {
            call_log_id: log.id,
            already_applied,
        })
    }
}
