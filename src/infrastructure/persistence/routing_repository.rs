//! PostgreSQL implementation of phone number routing

use super::db_error;
use crate::domain::routing::{
    BusinessHours, InboundRoutingRule, PhoneNumber, PhoneNumberRoute, RoutingRepository,
    RoutingRuleUpdate, RoutingType,
};
use crate::domain::shared::{DomainError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, info, warn};
use uuid::Uuid;

const RULE_COLUMNS: &str = r#"
    id, phone_number_id, user_id, campaign_id, routing_type,
    forward_to, ai_greeting,
    business_hours_only, business_hours_start, business_hours_end,
    is_active, created_at, updated_at
"#;

#[derive(FromRow)]
struct PhoneNumberRow {
    id: Uuid,
    user_id: Uuid,
    phone_number: String,
    campaign_id: Option<Uuid>,
    is_active: bool,
}

impl From<PhoneNumberRow> for PhoneNumber {
    fn from(r: PhoneNumberRow) -> Self {
        PhoneNumber {
            id: r.id,
            user_id: r.user_id,
            phone_number: r.phone_number,
            campaign_id: r.campaign_id,
            is_active: r.is_active,
        }
    }
}

#[derive(FromRow)]
struct RuleRow {
    id: Uuid,
    phone_number_id: Uuid,
    user_id: Uuid,
    campaign_id: Option<Uuid>,
    routing_type: String,
    forward_to: Option<String>,
    ai_greeting: Option<String>,
    business_hours_only: bool,
    business_hours_start: NaiveTime,
    business_hours_end: NaiveTime,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_routing_type(value: &str) -> RoutingType {
    RoutingType::from_str(value).unwrap_or_else(|| {
        warn!(routing_type = value, "Unknown routing type, using ai_agent");
        RoutingType::AiAgent
    })
}

impl From<RuleRow> for InboundRoutingRule {
    fn from(r: RuleRow) -> Self {
        InboundRoutingRule {
            id: r.id,
            phone_number_id: r.phone_number_id,
            user_id: r.user_id,
            campaign_id: r.campaign_id,
            routing_type: parse_routing_type(&r.routing_type),
            forward_to: r.forward_to,
            ai_greeting: r.ai_greeting,
            business_hours: BusinessHours {
                only: r.business_hours_only,
                start: r.business_hours_start,
                end: r.business_hours_end,
            },
            is_active: r.is_active,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

/// Phone number joined with its (optional) rule
#[derive(FromRow)]
struct RouteRow {
    pn_id: Uuid,
    pn_user_id: Uuid,
    pn_phone_number: String,
    pn_campaign_id: Option<Uuid>,
    pn_is_active: bool,
    id: Option<Uuid>,
    user_id: Option<Uuid>,
    campaign_id: Option<Uuid>,
    routing_type: Option<String>,
    forward_to: Option<String>,
    ai_greeting: Option<String>,
    business_hours_only: Option<bool>,
    business_hours_start: Option<NaiveTime>,
    business_hours_end: Option<NaiveTime>,
    is_active: Option<bool>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<RouteRow> for PhoneNumberRoute {
    fn from(r: RouteRow) -> Self {
        let defaults = BusinessHours::default();
        let rule = r.id.map(|id| InboundRoutingRule {
            id,
            phone_number_id: r.pn_id,
            user_id: r.user_id.unwrap_or(r.pn_user_id),
            campaign_id: r.campaign_id,
            routing_type: r
                .routing_type
                .as_deref()
                .map(parse_routing_type)
                .unwrap_or_default(),
            forward_to: r.forward_to,
            ai_greeting: r.ai_greeting,
            business_hours: BusinessHours {
                only: r.business_hours_only.unwrap_or(defaults.only),
                start: r.business_hours_start.unwrap_or(defaults.start),
                end: r.business_hours_end.unwrap_or(defaults.end),
            },
            is_active: r.is_active.unwrap_or(true),
            created_at: r.created_at.unwrap_or_else(Utc::now),
            updated_at: r.updated_at.unwrap_or_else(Utc::now),
        });

        PhoneNumberRoute {
            number: PhoneNumber {
                id: r.pn_id,
                user_id: r.pn_user_id,
                phone_number: r.pn_phone_number,
                campaign_id: r.pn_campaign_id,
                is_active: r.pn_is_active,
            },
            rule,
        }
    }
}

pub struct PgRoutingRepository {
    pool: PgPool,
}

impl PgRoutingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_rule(
        tx: &mut Transaction<'_, Postgres>,
        rule: &InboundRoutingRule,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO inbound_routing (
                id, phone_number_id, user_id, campaign_id, routing_type,
                forward_to, ai_greeting,
                business_hours_only, business_hours_start, business_hours_end,
                is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(rule.id)
        .bind(rule.phone_number_id)
        .bind(rule.user_id)
        .bind(rule.campaign_id)
        .bind(rule.routing_type.as_str())
        .bind(&rule.forward_to)
        .bind(&rule.ai_greeting)
        .bind(rule.business_hours.only)
        .bind(rule.business_hours.start)
        .bind(rule.business_hours.end)
        .bind(rule.is_active)
        .bind(rule.created_at)
        .bind(rule.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("insert routing rule", e))?;

        Ok(())
    }

    async fn update_rule(
        tx: &mut Transaction<'_, Postgres>,
        rule: &InboundRoutingRule,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE inbound_routing
            SET campaign_id = $2,
                routing_type = $3,
                forward_to = $4,
                ai_greeting = $5,
                business_hours_only = $6,
                business_hours_start = $7,
                business_hours_end = $8,
                is_active = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(rule.id)
        .bind(rule.campaign_id)
        .bind(rule.routing_type.as_str())
        .bind(&rule.forward_to)
        .bind(&rule.ai_greeting)
        .bind(rule.business_hours.only)
        .bind(rule.business_hours.start)
        .bind(rule.business_hours.end)
        .bind(rule.is_active)
        .bind(rule.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("update routing rule", e))?;

        Ok(())
    }
}

#[async_trait]
impl RoutingRepository for PgRoutingRepository {
    async fn find_route(&self, dialed_number: &str) -> Result<Option<PhoneNumberRoute>> {
        debug!(dialed_number, "Resolving inbound route");

        let row = sqlx::query_as::<_, RouteRow>(
            r#"
            SELECT pn.id AS pn_id,
                   pn.user_id AS pn_user_id,
                   pn.phone_number AS pn_phone_number,
                   pn.campaign_id AS pn_campaign_id,
                   pn.is_active AS pn_is_active,
                   ir.id, ir.user_id, ir.campaign_id, ir.routing_type,
                   ir.forward_to, ir.ai_greeting,
                   ir.business_hours_only, ir.business_hours_start, ir.business_hours_end,
                   ir.is_active, ir.created_at, ir.updated_at
            FROM phone_numbers pn
            LEFT JOIN inbound_routing ir ON ir.phone_number_id = pn.id
            WHERE pn.phone_number = $1 AND pn.is_active = TRUE
            LIMIT 1
            "#,
        )
        .bind(dialed_number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("resolve inbound route", e))?;

        Ok(row.map(PhoneNumberRoute::from))
    }

    async fn find_phone_number(&self, id: Uuid) -> Result<Option<PhoneNumber>> {
        let row = sqlx::query_as::<_, PhoneNumberRow>(
            "SELECT id, user_id, phone_number, campaign_id, is_active FROM phone_numbers WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("get phone number", e))?;

        Ok(row.map(PhoneNumber::from))
    }

    async fn find_rule(&self, phone_number_id: Uuid, user_id: Uuid) -> Result<Option<InboundRoutingRule>> {
        let sql = format!(
            "SELECT {} FROM inbound_routing WHERE phone_number_id = $1 AND user_id = $2",
            RULE_COLUMNS
        );

        let row = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(phone_number_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("get routing rule", e))?;

        Ok(row.map(InboundRoutingRule::from))
    }

    async fn upsert_rule(
        &self,
        phone_number_id: Uuid,
        user_id: Uuid,
        update: &RoutingRuleUpdate,
    ) -> Result<InboundRoutingRule> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("begin transaction", e))?;

        // Lock the number so concurrent upserts for it serialize
        let owned: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM phone_numbers WHERE id = $1 AND user_id = $2 FOR UPDATE",
        )
        .bind(phone_number_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("lock phone number", e))?;

        if owned.is_none() {
            return Err(DomainError::NotFound(format!(
                "Phone number not found: {}",
                phone_number_id
            )));
        }

        let sql = format!(
            "SELECT {} FROM inbound_routing WHERE phone_number_id = $1",
            RULE_COLUMNS
        );
        let existing = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(phone_number_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("get routing rule", e))?;

        let rule = match existing {
            Some(row) => {
                let mut rule = InboundRoutingRule::from(row);
                rule.apply(update);
                rule.validate()?;
                Self::update_rule(&mut tx, &rule).await?;
                rule
            }
            None => {
                let rule = InboundRoutingRule::from_update(phone_number_id, user_id, update);
                rule.validate()?;
                Self::insert_rule(&mut tx, &rule).await?;
                rule
            }
        };

        tx.commit()
            .await
            .map_err(|e| db_error("commit routing rule", e))?;

        info!(
            phone_number_id = %phone_number_id,
            routing_type = rule.routing_type.as_str(),
            "Routing rule saved"
        );
        Ok(rule)
    }

    async fn delete_rule(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM inbound_routing WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("delete routing rule", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound(format!("Routing rule not found: {}", id)));
        }
        Ok(())
    }

    async fn list_rules(&self, user_id: Uuid) -> Result<Vec<InboundRoutingRule>> {
        let sql = format!(
            "SELECT {} FROM inbound_routing WHERE user_id = $1 ORDER BY created_at DESC",
            RULE_COLUMNS
        );

        let rows = sqlx::query_as::<_, RuleRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("list routing rules", e))?;

        Ok(rows.into_iter().map(InboundRoutingRule::from).collect())
    }
}
