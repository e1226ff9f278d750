//! RecordPaymentSuccessHandler - Recovers a PaymentFailed subscription.

use std::sync::Arc;

use tracing::{debug, info};

use crate::application::notifications::NotificationDispatcher;
use crate::application::publishing::{level_display_name, lookup_level, publish_after_commit};
use crate::domain::foundation::{EventId, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::subscription::{
    BillingCalculator, Subscription, SubscriptionError, SubscriptionPaymentRecovered,
    SubscriptionStatus,
};
use crate::ports::{EventPublisher, SubscriptionLevelRepository, SubscriptionRepository};

/// Successful payment reported by the provider.
#[derive(Debug, Clone)]
pub struct RecordPaymentSuccessCommand {
    pub external_subscription_id: String,
    pub invoice_id: Option<String>,
    pub charge_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RecordPaymentSuccessResult {
    pub subscription: Subscription,
    /// False for regular successful payments on healthy subscriptions.
    pub changed: bool,
}

pub struct RecordPaymentSuccessHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl RecordPaymentSuccessHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            repository,
            levels,
            event_publisher,
            dispatcher,
        }
    }

    pub async fn handle(
        &self,
        cmd: RecordPaymentSuccessCommand,
    ) -> Result<RecordPaymentSuccessResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Find by provider reference
        let mut subscription = self
            .repository
            .find_by_external_id(&cmd.external_subscription_id)
            .await?
            .ok_or_else(|| {
                SubscriptionError::not_found("subscription", &cmd.external_subscription_id)
            })?;

        let new_charge = cmd
            .charge_id
            .filter(|c| subscription.external_charge_id.as_deref() != Some(c.as_str()));

        if subscription.status != SubscriptionStatus::PaymentFailed {
            if let Some(charge_ref) = new_charge {
                subscription.record_charge(charge_ref, now);
                self.repository.update(&subscription).await?;
            }
            debug!(
                subscription_id = %subscription.id,
                status = %subscription.status,
                "Payment succeeded on healthy subscription, nothing to recover"
            );
            return Ok(RecordPaymentSuccessResult {
                subscription,
                changed: false,
            });
        }

        // 2. Extend the paid period and reactivate
        let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
        let new_end = BillingCalculator::extended_end_date(&subscription, level.as_ref(), now);
        subscription.recover_payment(new_end, now)?;
        if let Some(charge_ref) = new_charge {
            subscription.record_charge(charge_ref, now);
        }
        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            invoice_id = cmd.invoice_id.as_deref().unwrap_or(""),
            new_end_date = %new_end,
            "Payment recovered"
        );

        // 3. Domain event
        let event = SubscriptionPaymentRecovered {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            new_end_date: new_end,
            recovered_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        // 4. Tell the subscriber
        self.dispatcher
            .notify_user(
                &subscription.user_id,
                &NotificationKind::PaymentSucceeded {
                    level_name: level_display_name(level.as_ref()),
                    next_end_date: new_end,
                },
            )
            .await;

        Ok(RecordPaymentSuccessResult {
            subscription,
            changed: true,
        })
    }
}
