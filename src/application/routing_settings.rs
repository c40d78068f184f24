//! Owner-scoped management of inbound routing rules

use crate::domain::routing::{InboundRoutingRule, RoutingRepository, RoutingRuleUpdate};
use crate::domain::shared::{DomainError, Result};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct RoutingSettingsService {
    routing: Arc<dyn RoutingRepository>,
}

impl RoutingSettingsService {
    pub fn new(routing: Arc<dyn RoutingRepository>) -> Self {
        Self { routing }
    }

    async fn ensure_owned(&self, user_id: Uuid, phone_number_id: Uuid) -> Result<()> {
        match self.routing.find_phone_number(phone_number_id).await? {
            Some(number) if number.user_id == user_id => Ok(()),
            _ => Err(DomainError::NotFound(format!(
                "Phone number not found: {}",
                phone_number_id
            ))),
        }
    }

    /// Rule of one of the user's numbers; `None` when not configured yet
    pub async fn get_rule(&self, user_id: Uuid, phone_number_id: Uuid) -> Result<Option<InboundRoutingRule>> {
        self.ensure_owned(user_id, phone_number_id).await?;
        self.routing.find_rule(phone_number_id, user_id).await
    }

    pub async fn save_rule(
        &self,
        user_id: Uuid,
        phone_number_id: Uuid,
        update: RoutingRuleUpdate,
    ) -> Result<InboundRoutingRule> {
        self.ensure_owned(user_id, phone_number_id).await?;
        let rule = self.routing.upsert_rule(phone_number_id, user_id, &update).await?;

        info!(
            user_id = %user_id,
            phone_number_id = %phone_number_id,
            routing_type = rule.routing_type.as_str(),
            "Routing rule updated"
        );
        Ok(rule)
    }

    pub async fn delete_rule(&self, user_id: Uuid, rule_id: Uuid) -> Result<()> {
        self.routing.delete_rule(rule_id, user_id).await?;
        info!(user_id = %user_id, rule_id = %rule_id, "Routing rule deleted");
        Ok(())
    }

    pub async fn list_rules(&self, user_id: Uuid) -> Result<Vec<InboundRoutingRule>> {
        self.routing.list_rules(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::routing::{MockRoutingRepository, PhoneNumber, RoutingType};
    use crate::infrastructure::persistence::InMemoryStore;

    #[tokio::test]
    async fn test_foreign_number_is_not_found() {
        let owner = Uuid::new_v4();
        let number_id = Uuid::new_v4();

        let mut routing = MockRoutingRepository::new();
        routing.expect_find_phone_number().returning(move |id| {
            Ok(Some(PhoneNumber {
                id,
                user_id: owner,
                phone_number: "+4930123456".to_string(),
                campaign_id: None,
                is_active: true,
            }))
        });
        routing.expect_upsert_rule().never();

        let service = RoutingSettingsService::new(Arc::new(routing));
        let result = service
            .save_rule(Uuid::new_v4(), number_id, RoutingRuleUpdate::default())
            .await;

        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_then_get() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let number = PhoneNumber {
            id: Uuid::new_v4(),
            user_id,
            phone_number: "+4930123456".to_string(),
            campaign_id: None,
            is_active: true,
        };
        store.add_phone_number(number.clone()).await;

        let service = RoutingSettingsService::new(Arc::new(store));
        assert!(service.get_rule(user_id, number.id).await.unwrap().is_none());

        let saved = service
            .save_rule(
                user_id,
                number.id,
                RoutingRuleUpdate {
                    routing_type: Some(RoutingType::Forward),
                    forward_to: Some(Some("+4930999".to_string())),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let fetched = service.get_rule(user_id, number.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, saved.id);
        assert_eq!(fetched.routing_type, RoutingType::Forward);
        assert_eq!(service.list_rules(user_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_forward_without_target_rejected() {
        let store = InMemoryStore::new();
        let user_id = Uuid::new_v4();
        let number_id = Uuid::new_v4();
        store
            .add_phone_number(PhoneNumber {
                id: number_id,
                user_id,
                phone_number: "+4930123456".to_string(),
                campaign_id: None,
                is_active: true,
            })
            .await;

        let result = RoutingSettingsService::new(Arc::new(store))
            .save_rule(
                user_id,
                number_id,
                RoutingRuleUpdate {
                    routing_type: Some(RoutingType::Forward),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(DomainError::ValidationError(_))));
    }
}
