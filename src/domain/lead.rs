//! Lead read model used to personalise calls

use super::shared::Result;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: Option<String>,
    pub company: Option<String>,
    pub phone_number: String,
}

impl Lead {
    /// "First Last", without dangling whitespace
    pub fn display_name(&self) -> String {
        format!(
            "{} {}",
            self.first_name,
            self.last_name.as_deref().unwrap_or_default()
        )
        .trim()
        .to_string()
    }
}

/// Lead lookup port
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LeadRepository: Send + Sync {
    /// Lead of `user_id` reachable at `phone_number`
    async fn find_by_phone(&self, user_id: Uuid, phone_number: &str) -> Result<Option<Lead>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(last_name: Option<&str>) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            first_name: "Anna".to_string(),
            last_name: last_name.map(str::to_string),
            company: None,
            phone_number: "+4930123456".to_string(),
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(lead(Some("Schmidt")).display_name(), "Anna Schmidt");
        assert_eq!(lead(None).display_name(), "Anna");
    }
}
