//! PostgreSQL implementation of the call log store

use super::db_error;
use crate::domain::call_log::{
    CallFinalization, CallLog, CallLogRepository, CallOutcome, FinalizeOutcome,
};
use crate::domain::shared::{CallLogId, CallSid, DomainError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

const COLUMNS: &str = r#"
    id, user_id, lead_id, campaign_id,
    provider_call_sid, room_name,
    duration_seconds, outcome, transcript, summary, finalization_keys,
    started_at, ended_at
"#;

#[derive(FromRow)]
struct CallLogRow {
    id: Uuid,
    user_id: Uuid,
    lead_id: Uuid,
    campaign_id: Option<Uuid>,
    provider_call_sid: Option<String>,
    room_name: Option<String>,
    duration_seconds: Option<i32>,
    outcome: Option<String>,
    transcript: Option<String>,
    summary: Option<String>,
    finalization_keys: Vec<String>,
    started_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl From<CallLogRow> for CallLog {
    fn from(r: CallLogRow) -> Self {
        CallLog {
            id: CallLogId::from_uuid(r.id),
            user_id: r.user_id,
            lead_id: r.lead_id,
            campaign_id: r.campaign_id,
            provider_call_sid: r.provider_call_sid.map(CallSid::new),
            room_name: r.room_name,
            duration_seconds: r.duration_seconds,
            outcome: r.outcome.as_deref().and_then(CallOutcome::from_str),
            transcript: r.transcript,
            summary: r.summary,
            finalization_keys: r.finalization_keys.into_iter().collect(),
            started_at: r.started_at,
            ended_at: r.ended_at,
        }
    }
}

/// Escape LIKE metacharacters so a fragment matches literally
fn escape_like(fragment: &str) -> String {
    let mut escaped = String::with_capacity(fragment.len());
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub struct PgCallLogRepository {
    pool: PgPool,
}

impl PgCallLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(&self, condition: &str, value: &str) -> Result<Option<CallLog>> {
        let sql = format!(
            "SELECT {} FROM call_logs WHERE {} ORDER BY started_at DESC LIMIT 1",
            COLUMNS, condition
        );

        let row = sqlx::query_as::<_, CallLogRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get call log", e))?;

        Ok(row.map(CallLog::from))
    }
}

#[async_trait]
impl CallLogRepository for PgCallLogRepository {
    async fn create(&self, log: &CallLog) -> Result<()> {
        debug!(call_log_id = %log.id, "Creating call log");

        sqlx::query(
            r#"
            INSERT INTO call_logs (
                id, user_id, lead_id, campaign_id,
                provider_call_sid, room_name,
                duration_seconds, outcome, transcript, summary, finalization_keys,
                started_at, ended_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(log.id.as_uuid())
        .bind(log.user_id)
        .bind(log.lead_id)
        .bind(log.campaign_id)
        .bind(log.provider_call_sid.as_ref().map(CallSid::as_str))
        .bind(&log.room_name)
        .bind(log.duration_seconds)
        .bind(log.outcome.map(|o| o.as_str()))
        .bind(&log.transcript)
        .bind(&log.summary)
        .bind(log.finalization_keys.iter().cloned().collect::<Vec<String>>())
        .bind(log.started_at)
        .bind(log.ended_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create call log", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: CallLogId) -> Result<Option<CallLog>> {
        let sql = format!("SELECT {} FROM call_logs WHERE id = $1", COLUMNS);

        let row = sqlx::query_as::<_, CallLogRow>(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get call log", e))?;

        Ok(row.map(CallLog::from))
    }

    async fn find_by_room_name(&self, room_name: &str) -> Result<Option<CallLog>> {
        self.fetch_one_where("room_name = $1", room_name).await
    }

    async fn find_latest_by_summary_fragment(&self, fragment: &str) -> Result<Option<CallLog>> {
        let pattern = format!("%{}%", escape_like(fragment));
        self.fetch_one_where("summary ILIKE $1", &pattern).await
    }

    async fn find_by_call_sid(&self, sid: &CallSid) -> Result<Option<CallLog>> {
        self.fetch_one_where("provider_call_sid = $1", sid.as_str())
            .await
    }

    async fn finalize(
        &self,
        id: CallLogId,
        facts: &CallFinalization,
        ended_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome> {
        // Single statement: concurrent finalizations of one log serialize on
        // the row lock, so appended summaries are never lost.
        let sql = format!(
            r#"
            UPDATE call_logs
            SET ended_at = $2,
                duration_seconds = COALESCE($3, duration_seconds),
                outcome = COALESCE($4::TEXT, outcome),
                transcript = COALESCE($5::TEXT, transcript),
                summary = CASE
                    WHEN $6::TEXT IS NULL THEN summary
                    WHEN summary IS NULL OR summary = '' THEN $6::TEXT
                    ELSE summary || E'\n\n' || $6::TEXT
                END,
                finalization_keys = CASE
                    WHEN $7::TEXT IS NULL THEN finalization_keys
                    ELSE array_append(finalization_keys, $7::TEXT)
                END
            WHERE id = $1
              AND ($7::TEXT IS NULL OR NOT ($7::TEXT = ANY(finalization_keys)))
            RETURNING {}
            "#,
            COLUMNS
        );

        let updated = sqlx::query_as::<_, CallLogRow>(&sql)
            .bind(id.as_uuid())
            .bind(ended_at)
            .bind(facts.duration_seconds)
            .bind(facts.outcome.map(|o| o.as_str()))
            .bind(&facts.transcript)
            .bind(&facts.summary)
            .bind(&facts.idempotency_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finalize call log", e))?;

        if let Some(row) = updated {
            info!(call_log_id = %id, "Call log finalized");
            return Ok(FinalizeOutcome::Applied(row.into()));
        }

        match self.find_by_id(id).await? {
            Some(log) => {
                warn!(
                    call_log_id = %id,
                    key = ?facts.idempotency_key,
                    "Finalization already applied, skipping"
                );
                Ok(FinalizeOutcome::AlreadyApplied(log))
            }
            None => Err(DomainError::NotFound(format!("Call log not found: {}", id))),
        }
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<CallLog>> {
        let sql = format!(
            "SELECT {} FROM call_logs WHERE user_id = $1 ORDER BY started_at DESC LIMIT $2 OFFSET $3",
            COLUMNS
        );

        let rows = sqlx::query_as::<_, CallLogRow>(&sql)
            .bind(user_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list call logs", e))?;

        Ok(rows.into_iter().map(CallLog::from).collect())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM call_logs WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("count call logs", e))?;

        Ok(count)
    }
}
