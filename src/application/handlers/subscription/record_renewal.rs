//! RecordRenewalHandler - Stores the outcome of an automatic renewal.

use std::sync::Arc;

use tracing::info;

use crate::application::publishing::{lookup_level, publish_after_commit};
use crate::domain::foundation::{EventId, SubscriptionId, Timestamp};
use crate::domain::subscription::{
    BillingCalculator, Subscription, SubscriptionError, SubscriptionRenewed,
};
use crate::ports::{EventPublisher, SubscriptionLevelRepository, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct RecordRenewalCommand {
    pub subscription_id: SubscriptionId,
    /// Provider reference of the renewed subscription.
    pub external_subscription_id: String,
    /// Charge taken for this period, if the provider reported one.
    pub charge_ref: Option<String>,
    pub renewed_at: Timestamp,
}

pub struct RecordRenewalHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
}

impl RecordRenewalHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        event_publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            levels,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: RecordRenewalCommand) -> Result<Subscription, SubscriptionError> {
        let now = cmd.renewed_at;

        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("subscription", cmd.subscription_id))?;

        // 1. Only auto-renewing active or trial subscriptions renew
        if !subscription.is_renewable() {
            return Err(SubscriptionError::invalid_state(subscription.status, "renew"));
        }

        // 2. Advance renewal and billing dates
        let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
        let next_billing = BillingCalculator::next_billing_date(&subscription, level.as_ref());
        subscription.record_renewal(cmd.external_subscription_id.clone(), next_billing, now);
        if let Some(charge_ref) = cmd.charge_ref {
            subscription.record_charge(charge_ref, now);
        }

        // 3. Persist
        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            external_subscription_id = %cmd.external_subscription_id,
            "Renewal recorded"
        );

        // 4. Domain event
        let event = SubscriptionRenewed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            external_subscription_id: cmd.external_subscription_id,
            next_renewal_date: subscription.next_renewal_date,
            renewed_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        Ok(subscription)
    }
}
