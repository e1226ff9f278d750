//! Read-mostly reference data ports: plans, promotions and users.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, PromotionId, SubscriptionLevelId, UserId};
use crate::domain::subscription::{Promotion, SubscriptionLevel};

/// Plan lookup.
#[async_trait]
pub trait SubscriptionLevelRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &SubscriptionLevelId,
    ) -> Result<Option<SubscriptionLevel>, DomainError>;
}

/// Promotion lookup.
#[async_trait]
pub trait PromotionRepository: Send + Sync {
    async fn find_by_id(&self, id: &PromotionId) -> Result<Option<Promotion>, DomainError>;

    /// Case-insensitive lookup by code.
    async fn find_by_code(&self, code: &str) -> Result<Option<Promotion>, DomainError>;
}

/// Contact details of a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserContact {
    pub id: UserId,
    pub email: Option<String>,
    pub display_name: String,
    pub push_token: Option<String>,
}

/// User lookup owned by the identity system.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserContact>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_ports_are_object_safe() {
        fn _levels(_repo: &dyn SubscriptionLevelRepository) {}
        fn _promotions(_repo: &dyn PromotionRepository) {}
        fn _users(_directory: &dyn UserDirectory) {}
    }
}
