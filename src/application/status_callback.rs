//! Provider call-status callbacks
//!
//! Terminal statuses finalize the call log linked to the provider call. The
//! idempotency key is derived from SID and status, so provider retries are
//! applied once.

use crate::domain::call_log::{CallFinalization, CallLogRepository, CallOutcome, FinalizeOutcome};
use crate::domain::shared::{CallSid, Clock, Result};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct StatusCallback {
    pub call_sid: String,
    pub call_status: String,
    /// Seconds, reported on completion
    pub call_duration: Option<i64>,
}

impl StatusCallback {
    pub fn idempotency_key(&self) -> String {
        format!("status:{}:{}", self.call_sid, self.call_status)
    }
}

pub struct StatusCallbackHandler {
    call_logs: Arc<dyn CallLogRepository>,
    clock: Arc<dyn Clock>,
}

impl StatusCallbackHandler {
    pub fn new(call_logs: Arc<dyn CallLogRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { call_logs, clock }
    }

    /// Returns `None` for non-terminal statuses and unknown calls
    pub async fn handle(&self, callback: &StatusCallback) -> Result<Option<FinalizeOutcome>> {
        let Some(outcome) = CallOutcome::from_provider_status(&callback.call_status) else {
            debug!(
                call_sid = %callback.call_sid,
                status = %callback.call_status,
                "Non-terminal call status"
            );
            return Ok(None);
        };

        if callback.call_sid.is_empty() {
            return Ok(None);
        }

        let sid = CallSid::new(callback.call_sid.clone());
        let Some(log) = self.call_logs.find_by_call_sid(&sid).await? else {
            debug!(call_sid = %sid, "No call log linked to call");
            return Ok(None);
        };

        // The client may already have recorded a business outcome
        let facts = CallFinalization {
            duration_seconds: callback
                .call_duration
                .filter(|d| *d >= 0)
                .and_then(|d| i32::try_from(d).ok()),
            outcome: log.outcome.is_none().then_some(outcome),
            transcript: None,
            summary: None,
            idempotency_key: Some(callback.idempotency_key()),
        };

        let result = self
            .call_logs
            .finalize(log.id, &facts, self.clock.now())
            .await?;

        let label = match &result {
            FinalizeOutcome::Applied(_) => "applied",
            FinalizeOutcome::AlreadyApplied(_) => "already_applied",
        };
        metrics::counter!("beavy_finalizations_total", "result" => label).increment(1);
        info!(
            call_sid = %sid,
            status = %callback.call_status,
            call_log_id = %log.id,
            result = label,
            "Call status recorded"
        );

        Ok(Some(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::call_log::{CallLog, MockCallLogRepository};
    use crate::domain::shared::SystemClock;
    use crate::infrastructure::persistence::InMemoryStore;
    use uuid::Uuid;

    fn callback(status: &str) -> StatusCallback {
        StatusCallback {
            call_sid: "CA55".to_string(),
            call_status: status.to_string(),
            call_duration: Some(37),
        }
    }

    #[tokio::test]
    async fn test_completed_call_finalizes_log() {
        let store = InMemoryStore::new();
        let log = CallLog::new(Uuid::new_v4(), Uuid::new_v4(), None).with_call_sid(CallSid::new("CA55"));
        CallLogRepository::create(&store, &log).await.unwrap();

        let handler = StatusCallbackHandler::new(Arc::new(store.clone()), Arc::new(SystemClock));
        let result = handler.handle(&callback("completed")).await.unwrap().unwrap();

        let finalized = result.call_log();
        assert_eq!(finalized.outcome, Some(CallOutcome::Answered));
        assert_eq!(finalized.duration_seconds, Some(37));
        assert!(finalized.ended_at.is_some());
        assert!(finalized.finalization_keys.contains("status:CA55:completed"));

        let retry = handler.handle(&callback("completed")).await.unwrap().unwrap();
        assert!(matches!(retry, FinalizeOutcome::AlreadyApplied(_)));
    }

    #[tokio::test]
    async fn test_keeps_client_outcome() {
        let store = InMemoryStore::new();
        let mut log = CallLog::new(Uuid::new_v4(), Uuid::new_v4(), None).with_call_sid(CallSid::new("CA55"));
        log.outcome = Some(CallOutcome::Interested);
        CallLogRepository::create(&store, &log).await.unwrap();

        let handler = StatusCallbackHandler::new(Arc::new(store), Arc::new(SystemClock));
        let result = handler.handle(&callback("completed")).await.unwrap().unwrap();

        assert_eq!(result.call_log().outcome, Some(CallOutcome::Interested));
    }

    #[tokio::test]
    async fn test_non_terminal_status_ignored() {
        let mut call_logs = MockCallLogRepository::new();
        call_logs.expect_find_by_call_sid().never();

        let handler = StatusCallbackHandler::new(Arc::new(call_logs), Arc::new(SystemClock));
        assert!(handler.handle(&callback("ringing")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_busy_maps_to_busy() {
        let store = InMemoryStore::new();
        let log = CallLog::new(Uuid::new_v4(), Uuid::new_v4(), None).with_call_sid(CallSid::new("CA55"));
        CallLogRepository::create(&store, &log).await.unwrap();

        let handler = StatusCallbackHandler::new(Arc::new(store), Arc::new(SystemClock));
        let result = handler.handle(&callback("busy")).await.unwrap().unwrap();
        assert_eq!(result.call_log().outcome, Some(CallOutcome::Busy));
    }

    #[tokio::test]
    async fn test_unknown_call_ignored() {
        let handler = StatusCallbackHandler::new(Arc::new(InMemoryStore::new()), Arc::new(SystemClock));
        assert!(handler.handle(&callback("no-answer")).await.unwrap().is_none());
    }
}
