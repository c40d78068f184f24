//! PostgreSQL lead lookup

use super::db_error;
use crate::domain::lead::{Lead, LeadRepository};
use crate::domain::shared::Result;
use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(FromRow)]
struct LeadRow {
    id: Uuid,
    user_id: Uuid,
    first_name: String,
    last_name: Option<String>,
    company: Option<String>,
    phone_number: String,
}

impl From<LeadRow> for Lead {
    fn from(r: LeadRow) -> Self {
        Lead {
            id: r.id,
            user_id: r.user_id,
            first_name: r.first_name,
            last_name: r.last_name,
            company: r.company,
            phone_number: r.phone_number,
        }
    }
}

pub struct PgLeadRepository {
    pool: PgPool,
}

impl PgLeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadRepository for PgLeadRepository {
    async fn find_by_phone(&self, user_id: Uuid, phone_number: &str) -> Result<Option<Lead>> {
        let row = sqlx::query_as::<_, LeadRow>(
            r#"
            SELECT id, user_id, first_name, last_name, company, phone_number
            FROM leads
            WHERE user_id = $1 AND phone_number = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find lead by phone", e))?;

        Ok(row.map(Lead::from))
    }
}
