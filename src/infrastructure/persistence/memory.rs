//! In-memory store for tests and database-less runs
//!
//! Implements every store port behind tokio locks. Each operation takes the
//! lock once, so finalization and upserts are atomic like their SQL
//! counterparts.

use crate::domain::call_log::{
    CallFinalization, CallLog, CallLogRepository, FinalizeOutcome,
};
use crate::domain::lead::{Lead, LeadRepository};
use crate::domain::routing::{
    InboundRoutingRule, PhoneNumber, PhoneNumberRoute, RoutingRepository, RoutingRuleUpdate,
};
use crate::domain::session::{CallSession, CallSessionRepository};
use crate::domain::shared::{CallLogId, CallSid, DomainError, Result, SessionId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct InMemoryStore {
    sessions: Arc<RwLock<HashMap<SessionId, CallSession>>>,
    call_logs: Arc<RwLock<Vec<CallLog>>>,
    phone_numbers: Arc<RwLock<HashMap<Uuid, PhoneNumber>>>,
    /// Keyed by phone number id, at most one rule per number
    rules: Arc<RwLock<HashMap<Uuid, InboundRoutingRule>>>,
    leads: Arc<RwLock<Vec<Lead>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a phone number
    pub async fn add_phone_number(&self, number: PhoneNumber) {
        self.phone_numbers.write().await.insert(number.id, number);
    }

    pub async fn add_lead(&self, lead: Lead) {
        self.leads.write().await.push(lead);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Newest log matching `predicate`; ties keep insertion order
    async fn newest_log(&self, predicate: impl Fn(&CallLog) -> bool) -> Option<CallLog> {
        self.call_logs
            .read()
            .await
            .iter()
            .filter(|log| predicate(log))
            .max_by_key(|log| log.started_at)
            .cloned()
    }
}

#[async_trait]
impl CallSessionRepository for InMemoryStore {
    async fn create(&self, session: &CallSession) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(DomainError::Conflict(format!("Session exists: {}", session.id)));
        }
        sessions.insert(session.id, session.clone());
        debug!(session_id = %session.id, "Session stored");
        Ok(())
    }

    async fn find_by_id(&self, id: SessionId) -> Result<Option<CallSession>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn attach_call_sid(&self, id: SessionId, sid: &CallSid) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or_else(|| DomainError::NotFound(format!("Session not found: {}", id)))?;
        session.attach_call_sid(sid.clone())
    }
}

#[async_trait]
impl CallLogRepository for InMemoryStore {
    async fn create(&self, log: &CallLog) -> Result<()> {
        self.call_logs.write().await.push(log.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CallLogId) -> Result<Option<CallLog>> {
        Ok(self
            .call_logs
            .read()
            .await
            .iter()
            .find(|log| log.id == id)
            .cloned())
    }

    async fn find_by_room_name(&self, room_name: &str) -> Result<Option<CallLog>> {
        Ok(self
            .newest_log(|log| log.room_name.as_deref() == Some(room_name))
            .await)
    }

    async fn find_latest_by_summary_fragment(&self, fragment: &str) -> Result<Option<CallLog>> {
        let needle = fragment.to_lowercase();
        Ok(self
            .newest_log(|log| {
                log.summary
                    .as_deref()
                    .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .await)
    }

    async fn find_by_call_sid(&self, sid: &CallSid) -> Result<Option<CallLog>> {
        Ok(self
            .newest_log(|log| log.provider_call_sid.as_ref() == Some(sid))
            .await)
    }

    async fn finalize(
        &self,
        id: CallLogId,
        facts: &CallFinalization,
        ended_at: DateTime<Utc>,
    ) -> Result<FinalizeOutcome> {
        let mut logs = self.call_logs.write().await;
        let log = logs
            .iter_mut()
            .find(|log| log.id == id)
            .ok_or_else(|| DomainError::NotFound(format!("Call log not found: {}", id)))?;

        if log.apply_finalization(facts, ended_at) {
            Ok(FinalizeOutcome::Applied(log.clone()))
        } else {
            Ok(FinalizeOutcome::AlreadyApplied(log.clone()))
        }
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64, offset: i64) -> Result<Vec<CallLog>> {
        let mut logs: Vec<CallLog> = self
            .call_logs
            .read()
            .await
            .iter()
            .filter(|log| log.user_id == user_id)
            .cloned()
            .collect();

        // stable sort keeps later inserts after earlier ones on ties, so reverse first
        logs.reverse();
        logs.sort_by(|a, b| b.started_at.cmp(&a.started_at));

        Ok(logs
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn count_for_user(&self, user_id: Uuid) -> Result<i64> {
        Ok(self
            .call_logs
            .read()
            .await
            .iter()
            .filter(|log| log.user_id == user_id)
            .count() as i64)
    }
}

#[async_trait]
impl RoutingRepository for InMemoryStore {
    async fn find_route(&self, dialed_number: &str) -> Result<Option<PhoneNumberRoute>> {
        let numbers = self.phone_numbers.read().await;
        let Some(number) = numbers
            .values()
            .find(|n| n.is_active && n.phone_number == dialed_number)
        else {
            return Ok(None);
        };

        let rule = self.rules.read().await.get(&number.id).cloned();
        Ok(Some(PhoneNumberRoute {
            number: number.clone(),
            rule,
        }))
    }

    async fn find_phone_number(&self, id: Uuid) -> Result<Option<PhoneNumber>> {
        Ok(self.phone_numbers.read().await.get(&id).cloned())
    }

    async fn find_rule(&self, phone_number_id: Uuid, user_id: Uuid) -> Result<Option<InboundRoutingRule>> {
        Ok(self
            .rules
            .read()
            .await
            .get(&phone_number_id)
            .filter(|rule| rule.user_id == user_id)
            .cloned())
    }

    async fn upsert_rule(
        &self,
        phone_number_id: Uuid,
        user_id: Uuid,
        update: &RoutingRuleUpdate,
    ) -> Result<InboundRoutingRule> {
        let owned = self
            .phone_numbers
            .read()
            .await
            .get(&phone_number_id)
            .is_some_and(|n| n.user_id == user_id);
        if !owned {
            return Err(DomainError::NotFound(format!(
                "Phone number not found: {}",
                phone_number_id
            )));
        }

        let mut rules = self.rules.write().await;
        let rule = match rules.get(&phone_number_id) {
            Some(existing) => {
                let mut rule = existing.clone();
                rule.apply(update);
                rule
            }
            None => InboundRoutingRule::from_update(phone_number_id, user_id, update),
        };
        rule.validate()?;

        rules.insert(phone_number_id, rule.clone());
        Ok(rule)
    }

    async fn delete_rule(&self, id: Uuid, user_id: Uuid) -> Result<()> {
        let mut rules = self.rules.write().await;
        let key = rules
            .iter()
            .find(|(_, rule)| rule.id == id && rule.user_id == user_id)
            .map(|(key, _)| *key)
            .ok_or_else(|| DomainError::NotFound(format!("Routing rule not found: {}", id)))?;

        rules.remove(&key);
        Ok(())
    }

    async fn list_rules(&self, user_id: Uuid) -> Result<Vec<InboundRoutingRule>> {
        let mut rules: Vec<InboundRoutingRule> = self
            .rules
            .read()
            .await
            .values()
            .filter(|rule| rule.user_id == user_id)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rules)
    }
}

#[async_trait]
impl LeadRepository for InMemoryStore {
    async fn find_by_phone(&self, user_id: Uuid, phone_number: &str) -> Result<Option<Lead>> {
        Ok(self
            .leads
            .read()
            .await
            .iter()
            .rev()
            .find(|lead| lead.user_id == user_id && lead.phone_number == phone_number)
            .cloned())
    }
}
