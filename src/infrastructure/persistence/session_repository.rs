//! PostgreSQL implementation of the call session store

use super::db_error;
use crate::domain::session::{CallSession, CallSessionRepository};
use crate::domain::shared::{CallSid, DomainError, Result, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(FromRow)]
struct SessionRow {
    id: Uuid,
    user_id: Uuid,
    lead_id: Option<Uuid>,
    campaign_id: Option<Uuid>,
    campaign_prompt: String,
    lead_name: String,
    lead_company: String,
    call_sid: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for CallSession {
    fn from(r: SessionRow) -> Self {
        CallSession {
            id: SessionId::from_uuid(r.id),
            user_id: r.user_id,
            lead_id: r.lead_id,
            campaign_id: r.campaign_id,
            campaign_prompt: r.campaign_prompt,
            lead_name: r.lead_name,
            lead_company: r.lead_company,
            call_sid: r.call_sid.map(CallSid::new),
            created_at: r.created_at,
        }
    }
}

pub struct PgCallSessionRepository {
    pool: PgPool,
}

impl PgCallSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CallSessionRepository for PgCallSessionRepository {
    async fn create(&self, session: &CallSession) -> Result<()> {
        debug!(session_id = %session.id, "Creating call session");

        sqlx::query(
            r#"
            INSERT INTO call_sessions (
                id, user_id, lead_id, campaign_id,
                campaign_prompt, lead_name, lead_company,
                call_sid, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(session.user_id)
        .bind(session.lead_id)
        .bind(session.campaign_id)
        .bind(&session.campaign_prompt)
        .bind(&session.lead_name)
        .bind(&session.lead_company)
        .bind(session.call_sid.as_ref().map(CallSid::as_str))
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("create call session", e))?;

        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<CallSession>> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_id, lead_id, campaign_id,
                   campaign_prompt, lead_name, lead_company,
                   call_sid, created_at
            FROM call_sessions
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get call session", e))?;

        Ok(row.map(CallSession::from))
    }

    async fn attach_call_sid(&self, id: SessionId, sid: &CallSid) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE call_sessions
            SET call_sid = $2
            WHERE id = $1 AND (call_sid IS NULL OR call_sid = $2)
            "#,
        )
        .bind(id.as_uuid())
        .bind(sid.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("attach call sid", e))?;

        if result.rows_affected() > 0 {
            debug!(session_id = %id, call_sid = %sid, "Call SID attached");
            return Ok(());
        }

        match self.find_by_id(id).await? {
            None => Err(DomainError::NotFound(format!("Session not found: {}", id))),
            Some(session) => {
                warn!(
                    session_id = %id,
                    existing = ?session.call_sid,
                    rejected = %sid,
                    "Session already linked to another call"
                );
                Err(DomainError::Conflict(format!(
                    "session {} is already linked to another call",
                    id
                )))
            }
        }
    }
}
