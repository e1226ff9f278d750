//! ReactivateSubscriptionHandler - Command handler for reactivating cancelled subscriptions.

use std::sync::Arc;

use tracing::{error, info};

use crate::application::publishing::{level_display_name, lookup_level, publish_after_commit};
use crate::domain::foundation::{EventId, SubscriptionId, Timestamp};
use crate::domain::subscription::{
    BillingCalculator, ReactivationDate, Subscription, SubscriptionError, SubscriptionReactivated,
    SubscriptionStatus,
};
use crate::ports::{
    AccessControlPublisher, AccessSignal, EventPublisher, SubscriptionLevelRepository,
    SubscriptionRepository,
};

/// Command to reactivate a cancelled subscription.
#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionCommand {
    pub subscription_id: SubscriptionId,
}

/// Result of successful reactivation.
#[derive(Debug, Clone)]
pub struct ReactivateSubscriptionResult {
    pub subscription: Subscription,
    /// Whether the billing date was computed or estimated.
    pub next_billing_date: ReactivationDate,
}

pub struct ReactivateSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    access_control: Arc<dyn AccessControlPublisher>,
}

impl ReactivateSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        access_control: Arc<dyn AccessControlPublisher>,
    ) -> Self {
        Self {
            repository,
            levels,
            event_publisher,
            access_control,
        }
    }

    pub async fn handle(
        &self,
        cmd: ReactivateSubscriptionCommand,
    ) -> Result<ReactivateSubscriptionResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Load and check state
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("subscription", cmd.subscription_id))?;

        if subscription.status != SubscriptionStatus::Cancelled {
            return Err(SubscriptionError::invalid_state(subscription.status, "reactivate"));
        }

        // 2. Billing date anchored on the cancellation
        let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
        let next_billing = BillingCalculator::next_billing_date_after_reactivation(
            &subscription,
            level.as_ref(),
            now,
        );

        // 3. Transition and persist
        subscription.reactivate(next_billing.date(), now)?;
        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            next_billing_date = %next_billing.date(),
            estimated = next_billing.is_fallback(),
            "Subscription reactivated"
        );

        // 4. Domain event
        let event = SubscriptionReactivated {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            next_billing_date: next_billing.date(),
            billing_date_estimated: next_billing.is_fallback(),
            reactivated_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        // 5. Restore access
        let signal = AccessSignal {
            user_id: subscription.user_id.clone(),
            subscription_id: subscription.id,
            level: level_display_name(level.as_ref()),
            reason: "reactivated".to_string(),
            occurred_at: now,
        };
        if let Err(e) = self.access_control.subscription_reactivated(signal).await {
            error!(
                subscription_id = %subscription.id,
                error = %e,
                "Failed to publish access restoration"
            );
        }

        Ok(ReactivateSubscriptionResult {
            subscription,
            next_billing_date: next_billing,
        })
    }
}
