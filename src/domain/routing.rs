//! Inbound routing domain model
//!
//! Every provisioned phone number can carry one routing rule deciding how an
//! inbound call is handled (AI agent, forward, voicemail) and when (business
//! hours).

use super::shared::{DomainError, Result};
use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Routing type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingType {
    /// Hand the caller to the AI voice agent
    #[default]
    AiAgent,
    /// Dial a configured number
    Forward,
    /// Record a message
    Voicemail,
}

impl RoutingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingType::AiAgent => "ai_agent",
            RoutingType::Forward => "forward",
            RoutingType::Voicemail => "voicemail",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ai_agent" => Some(RoutingType::AiAgent),
            "forward" => Some(RoutingType::Forward),
            "voicemail" => Some(RoutingType::Voicemail),
            _ => None,
        }
    }
}

/// Business-hours window, evaluated at hour granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    /// Restrict calls to the window
    pub only: bool,
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            only: false,
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl BusinessHours {
    /// Whether `time` falls in `[start_hour, end_hour)`. Minutes are ignored
    /// on the bounds and on `time`.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let hour = time.hour();
        hour >= self.start.hour() && hour < self.end.hour()
    }

    /// Whether a call arriving at `local_time` may be accepted
    pub fn accepts(&self, local_time: NaiveTime) -> bool {
        !self.only || self.contains(local_time)
    }
}

/// Parse "HH:MM" or "HH:MM:SS"
pub fn parse_clock_time(value: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| DomainError::ValidationError(format!("invalid time of day: {}", value)))
}

/// Inbound routing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundRoutingRule {
    pub id: Uuid,
    pub phone_number_id: Uuid,
    pub user_id: Uuid,
    pub campaign_id: Option<Uuid>,
    pub routing_type: RoutingType,
    pub forward_to: Option<String>,
    pub ai_greeting: Option<String>,
    pub business_hours: BusinessHours,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update coming from the settings API
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingRuleUpdate {
    pub routing_type: Option<RoutingType>,
    /// `Some(None)` clears the value
    pub forward_to: Option<Option<String>>,
    pub ai_greeting: Option<Option<String>>,
    pub business_hours_only: Option<bool>,
    pub business_hours_start: Option<NaiveTime>,
    pub business_hours_end: Option<NaiveTime>,
    pub is_active: Option<bool>,
    pub campaign_id: Option<Option<Uuid>>,
}

impl InboundRoutingRule {
    /// Rule created from an update when none exists yet
    pub fn from_update(phone_number_id: Uuid, user_id: Uuid, update: &RoutingRuleUpdate) -> Self {
        let now = Utc::now();
        let mut rule = Self {
            id: Uuid::new_v4(),
            phone_number_id,
            user_id,
            campaign_id: None,
            routing_type: RoutingType::default(),
            forward_to: None,
            ai_greeting: None,
            business_hours: BusinessHours::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        rule.apply(update);
        rule
    }

    /// Merge a partial update
    pub fn apply(&mut self, update: &RoutingRuleUpdate) {
        if let Some(routing_type) = update.routing_type {
            self.routing_type = routing_type;
        }
        if let Some(forward_to) = &update.forward_to {
            self.forward_to = forward_to.clone();
        }
        if let Some(greeting) = &update.ai_greeting {
            self.ai_greeting = greeting.clone();
        }
        if let Some(only) = update.business_hours_only {
            self.business_hours.only = only;
        }
        if let Some(start) = update.business_hours_start {
            self.business_hours.start = start;
        }
        if let Some(end) = update.business_hours_end {
            self.business_hours.end = end;
        }
        if let Some(active) = update.is_active {
            self.is_active = active;
        }
        if let Some(campaign_id) = update.campaign_id {
            self.campaign_id = campaign_id;
        }
        self.updated_at = Utc::now();
    }

    /// A forward rule needs a target number, and an enforced window must not
    /// wrap past midnight
    pub fn validate(&self) -> Result<()> {
        if self.routing_type == RoutingType::Forward
            && self.forward_to.as_deref().map_or(true, |n| n.trim().is_empty())
        {
            return Err(DomainError::ValidationError(
                "forward_to is required for forward routing".to_string(),
            ));
        }
        let hours = &self.business_hours;
        if hours.only && hours.start.hour() >= hours.end.hour() {
            return Err(DomainError::ValidationError(format!(
                "business hours start ({}) must be before end ({})",
                hours.start.format("%H:%M"),
                hours.end.format("%H:%M")
            )));
        }
        Ok(())
    }

    /// Greeting configured on the rule, if any
    pub fn greeting(&self) -> Option<&str> {
        self.ai_greeting.as_deref().filter(|g| !g.trim().is_empty())
    }
}

/// Provisioned phone number (read model)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub id: Uuid,
    pub user_id: Uuid,
    /// E.164 number as dialed by callers
    pub phone_number: String,
    pub campaign_id: Option<Uuid>,
    pub is_active: bool,
}

/// A dialed number together with its routing rule
#[derive(Debug, Clone, PartialEq)]
pub struct PhoneNumberRoute {
    pub number: PhoneNumber,
    pub rule: Option<InboundRoutingRule>,
}

impl PhoneNumberRoute {
    /// The rule in force; inactive rules count as absent
    pub fn active_rule(&self) -> Option<&InboundRoutingRule> {
        self.rule.as_ref().filter(|r| r.is_active)
    }

    pub fn routing_type(&self) -> RoutingType {
        self.active_rule()
            .map(|r| r.routing_type)
            .unwrap_or_default()
    }
}

/// Routing store port
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RoutingRepository: Send + Sync {
    /// Resolve a dialed number with its routing rule in one lookup
    async fn find_route(&self, dialed_number: &str) -> Result<Option<PhoneNumberRoute>>;

    /// Get phone number by ID
    async fn find_phone_number(&self, id: Uuid) -> Result<Option<PhoneNumber>>;

    /// Rule of a phone number owned by `user_id`
    async fn find_rule(&self, phone_number_id: Uuid, user_id: Uuid) -> Result<Option<InboundRoutingRule>>;

    /// Update the existing rule of the number, or insert one
    async fn upsert_rule(
        &self,
        phone_number_id: Uuid,
        user_id: Uuid,
        update: &RoutingRuleUpdate,
    ) -> Result<InboundRoutingRule>;

    /// Delete a rule owned by `user_id`
    async fn delete_rule(&self, id: Uuid, user_id: Uuid) -> Result<()>;

    /// All rules of a user
    async fn list_rules(&self, user_id: Uuid) -> Result<Vec<InboundRoutingRule>>;
}
