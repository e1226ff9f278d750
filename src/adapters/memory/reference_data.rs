//! In-memory plan, promotion and user lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, PromotionId, SubscriptionLevelId, UserId};
use crate::domain::subscription::{Promotion, SubscriptionLevel};
use crate::ports::{PromotionRepository, SubscriptionLevelRepository, UserContact, UserDirectory};

/// Plans keyed by ID.
#[derive(Default)]
pub struct InMemoryLevelRepository {
    levels: RwLock<HashMap<SubscriptionLevelId, SubscriptionLevel>>,
}

impl InMemoryLevelRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, level: SubscriptionLevel) {
        self.levels.write().await.insert(level.id, level);
    }
}

#[async_trait]
impl SubscriptionLevelRepository for InMemoryLevelRepository {
    async fn find_by_id(
        &self,
        id: &SubscriptionLevelId,
    ) -> Result<Option<SubscriptionLevel>, DomainError> {
        Ok(self.levels.read().await.get(id).cloned())
    }
}

/// Promotions keyed by ID.
#[derive(Default)]
pub struct InMemoryPromotionRepository {
    promotions: RwLock<HashMap<PromotionId, Promotion>>,
}

impl InMemoryPromotionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, promotion: Promotion) {
        self.promotions.write().await.insert(promotion.id, promotion);
    }
}

#[async_trait]
impl PromotionRepository for InMemoryPromotionRepository {
    async fn find_by_id(&self, id: &PromotionId) -> Result<Option<Promotion>, DomainError> {
        Ok(self.promotions.read().await.get(id).cloned())
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Promotion>, DomainError> {
        let code = code.trim().to_uppercase();
        Ok(self
            .promotions
            .read()
            .await
            .values()
            .find(|p| p.code == code)
            .cloned())
    }
}

/// Users keyed by ID.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, UserContact>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, contact: UserContact) {
        self.users.write().await.insert(contact.id.clone(), contact);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserContact>, DomainError> {
        Ok(self.users.read().await.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Timestamp;

    #[tokio::test]
    async fn promotion_lookup_ignores_case() {
        let repo = InMemoryPromotionRepository::new();
        let now = Timestamp::now();
        let promo = Promotion::new("SPRING", 20, now.minus_days(1), now.add_days(1)).unwrap();
        repo.insert(promo.clone()).await;

        assert_eq!(repo.find_by_code(" spring ").await.unwrap(), Some(promo));
        assert_eq!(repo.find_by_code("autumn").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unknown_user_is_none() {
        let directory = InMemoryUserDirectory::new();
        let id = UserId::new("ghost").unwrap();
        assert!(directory.find_by_id(&id).await.unwrap().is_none());
    }
}
