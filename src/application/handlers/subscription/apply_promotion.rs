//! ApplyPromotionHandler - Attaches a promotion code to a subscription.

use std::sync::Arc;

use tracing::info;

use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::domain::subscription::{Promotion, Subscription, SubscriptionError};
use crate::ports::{PromotionRepository, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct ApplyPromotionCommand {
    pub subscription_id: SubscriptionId,
    /// Customer-entered code, matched case-insensitively.
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct ApplyPromotionResult {
    pub subscription: Subscription,
    pub promotion: Promotion,
}

pub struct ApplyPromotionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    promotions: Arc<dyn PromotionRepository>,
}

impl ApplyPromotionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        promotions: Arc<dyn PromotionRepository>,
    ) -> Self {
        Self {
            repository,
            promotions,
        }
    }

    pub async fn handle(
        &self,
        cmd: ApplyPromotionCommand,
    ) -> Result<ApplyPromotionResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Load both sides
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("subscription", cmd.subscription_id))?;

        let promotion = self
            .promotions
            .find_by_code(&cmd.code)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("promotion", cmd.code.trim()))?;

        // 2. Validity window
        if !promotion.is_applicable_at(now) {
            return Err(SubscriptionError::validation(
                "promotion",
                format!("promotion {} is not currently valid", promotion.code),
            ));
        }

        // 3. Attach and persist
        subscription.attach_promotion(promotion.id, now)?;
        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            promotion = %promotion.code,
            discount = promotion.discount_percentage,
            "Promotion applied"
        );

        Ok(ApplyPromotionResult {
            subscription,
            promotion,
        })
    }
}
