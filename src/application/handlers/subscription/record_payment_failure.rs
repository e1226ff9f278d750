//! RecordPaymentFailureHandler - Marks a subscription as PaymentFailed.

use std::sync::Arc;

use tracing::{info, warn};

use crate::application::notifications::NotificationDispatcher;
use crate::application::publishing::{level_display_name, lookup_level, publish_after_commit};
use crate::domain::foundation::{EventId, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::subscription::{
    Subscription, SubscriptionError, SubscriptionPaymentFailed, SubscriptionStatus,
};
use crate::ports::{EventPublisher, SubscriptionLevelRepository, SubscriptionRepository};

/// Payment failure reported by the provider.
#[derive(Debug, Clone)]
pub struct RecordPaymentFailureCommand {
    pub external_subscription_id: String,
    pub invoice_id: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct RecordPaymentFailureResult {
    pub subscription: Subscription,
    /// False when the subscription was already in PaymentFailed.
    pub changed: bool,
}

pub struct RecordPaymentFailureHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl RecordPaymentFailureHandler {
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
        cmd: RecordPaymentFailureCommand,
    ) -> Result<RecordPaymentFailureResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Find by provider reference
        let mut subscription = self
            .repository
            .find_by_external_id(&cmd.external_subscription_id)
            .await?
            .ok_or_else(|| {
                SubscriptionError::not_found("subscription", &cmd.external_subscription_id)
            })?;

        // Redelivered callback
        if subscription.status == SubscriptionStatus::PaymentFailed {
            warn!(
                subscription_id = %subscription.id,
                "Payment failure already recorded, ignoring"
            );
            return Ok(RecordPaymentFailureResult {
                subscription,
                changed: false,
            });
        }

        // 2. Transition and persist
        subscription.mark_payment_failed(cmd.reason.clone(), now)?;
        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            reason = %cmd.reason,
            "Payment failure recorded"
        );

        // 3. Domain event
        let event = SubscriptionPaymentFailed {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            invoice_id: cmd.invoice_id,
            reason: cmd.reason.clone(),
            failed_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        // 4. Tell the subscriber
        let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
        self.dispatcher
            .notify_user(
                &subscription.user_id,
                &NotificationKind::PaymentFailed {
                    level_name: level_display_name(level.as_ref()),
                    reason: cmd.reason,
                },
            )
            .await;

        Ok(RecordPaymentFailureResult {
            subscription,
            changed: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;

    fn handler(fx: &Fixture) -> RecordPaymentFailureHandler {
        RecordPaymentFailureHandler::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.events.clone(),
            fx.dispatcher(),
        )
    }

    fn command(reason: &str) -> RecordPaymentFailureCommand {
        RecordPaymentFailureCommand {
            external_subscription_id: "sub_ext_1".to_string(),
            invoice_id: Some("in_1".to_string()),
            reason: reason.to_string(),
        }
    }

    #[tokio::test]
    async fn marks_failed_with_reason() {
        let fx = Fixture::new().await;
        let sub = fx.active_subscription(Timestamp::now());
        fx.store(&sub).await;

        let result = handler(&fx).handle(command("card_declined")).await.unwrap();

        assert!(result.changed);
        let stored = fx.reload(&sub.id).await;
        assert_eq!(stored.status, SubscriptionStatus::PaymentFailed);
        assert_eq!(stored.last_payment_error.as_deref(), Some("card_declined"));

        let events = fx.events.events_of_type("subscription.payment_failed.v1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["invoice_id"], "in_1");

        let mails = fx.mail.delivered();
        assert_eq!(mails.len(), 1);
        assert!(mails[0].body.contains("card_declined"));
    }

    #[tokio::test]
    async fn redelivery_is_a_no_op() {
        let fx = Fixture::new().await;
        let sub = fx.active_subscription(Timestamp::now());
        fx.store(&sub).await;
        let handler = handler(&fx);
        handler.handle(command("card_declined")).await.unwrap();

        let again = handler.handle(command("card_declined")).await.unwrap();

        assert!(!again.changed);
        assert_eq!(fx.events.event_count(), 1);
        assert_eq!(fx.mail.delivered().len(), 1);
    }

    #[tokio::test]
    async fn cancelled_subscription_rejects_failure() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut sub = fx.active_subscription(now);
        sub.cancel(now).unwrap();
        fx.store(&sub).await;

        let err = handler(&fx).handle(command("x")).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::InvalidState { .. }));
    }

    #[tokio::test]
    async fn unknown_external_id_is_not_found() {
        let fx = Fixture::new().await;

        let err = handler(&fx).handle(command("x")).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::NotFound { .. }));
    }
}
