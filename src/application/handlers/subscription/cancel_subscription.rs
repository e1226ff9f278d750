//! CancelSubscriptionHandler - Command handler for cancelling subscriptions.

use std::sync::Arc;

use tracing::{error, info};

use crate::application::notifications::NotificationDispatcher;
use crate::application::publishing::{level_display_name, lookup_level, publish_after_commit};
use crate::application::sync::DataSynchronizer;
use crate::application::CallDeadline;
use crate::domain::foundation::{EventId, SubscriptionId, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::subscription::{Subscription, SubscriptionCancelled, SubscriptionError};
use crate::ports::{
    AccessControlPublisher, AccessSignal, EventPublisher, PaymentGateway,
    SubscriptionLevelRepository, SubscriptionRepository,
};

/// Default refund window for early cancellations.
pub const DEFAULT_REFUND_WINDOW_DAYS: i64 = 7;

/// Command to cancel a subscription.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionCommand {
    pub subscription_id: SubscriptionId,
    pub reason: String,
}

/// Result of successful cancellation.
#[derive(Debug, Clone)]
pub struct CancelSubscriptionResult {
    pub subscription: Subscription,
    /// Set when the cancellation fell inside the refund window.
    pub refund_id: Option<String>,
}

/// Handler for cancelling subscriptions.
///
/// Cancellations within the refund window refund the last charge first; a
/// failed refund aborts the cancellation.
pub struct CancelSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    payments: Arc<dyn PaymentGateway>,
    event_publisher: Arc<dyn EventPublisher>,
    access_control: Arc<dyn AccessControlPublisher>,
    synchronizer: Arc<DataSynchronizer>,
    dispatcher: Arc<NotificationDispatcher>,
    refund_window_days: i64,
    deadline: CallDeadline,
}

impl CancelSubscriptionHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        payments: Arc<dyn PaymentGateway>,
        event_publisher: Arc<dyn EventPublisher>,
        access_control: Arc<dyn AccessControlPublisher>,
        synchronizer: Arc<DataSynchronizer>,
        dispatcher: Arc<NotificationDispatcher>,
        deadline: CallDeadline,
    ) -> Self {
        Self {
            repository,
            levels,
            payments,
            event_publisher,
            access_control,
            synchronizer,
            dispatcher,
            refund_window_days: DEFAULT_REFUND_WINDOW_DAYS,
            deadline,
        }
    }

    pub fn with_refund_window_days(mut self, days: i64) -> Self {
        self.refund_window_days = days;
        self
    }

    pub async fn handle(
        &self,
        cmd: CancelSubscriptionCommand,
    ) -> Result<CancelSubscriptionResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Load
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("subscription", cmd.subscription_id))?;

        // 2. Transition in memory (rejects invalid states before any refund)
        let within_window = subscription.started_within_days(self.refund_window_days, now);
        subscription.cancel(now)?;

        // 3. Refund early cancellations before finalizing
        let refund_id = match (&subscription.external_charge_id, within_window) {
            (Some(charge_id), true) => {
                let reason = format!("Subscription cancelled: {}", cmd.reason);
                let refund_id = self
                    .deadline
                    .payment(self.payments.refund(charge_id, &reason))
                    .await
                    .map_err(|e| {
                        error!(
                            subscription_id = %subscription.id,
                            error = %e,
                            "Refund failed, cancellation aborted"
                        );
                        SubscriptionError::from(e)
                    })?;
                Some(refund_id)
            }
            _ => None,
        };

        // 4. Persist
        self.repository.update(&subscription).await?;

        info!(
            subscription_id = %subscription.id,
            refunded = refund_id.is_some(),
            "Subscription cancelled"
        );

        // 5. Domain event
        let event = SubscriptionCancelled {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            reason: cmd.reason.clone(),
            refund_id: refund_id.clone(),
            cancelled_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        // 6. Revoke access
        let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
        let level_name = level_display_name(level.as_ref());
        let signal = AccessSignal {
            user_id: subscription.user_id.clone(),
            subscription_id: subscription.id,
            level: level_name.clone(),
            reason: cmd.reason,
            occurred_at: now,
        };
        if let Err(e) = self.access_control.subscription_cancelled(signal).await {
            error!(
                subscription_id = %subscription.id,
                error = %e,
                "Failed to publish access revocation"
            );
        }

        // 7. Analytics feed
        if let Some(external_id) = &subscription.external_subscription_id {
            self.synchronizer
                .notify_cancellation_event(external_id, now)
                .await;
        }

        // 8. Confirmation
        self.dispatcher
            .notify_user(
                &subscription.user_id,
                &NotificationKind::CancellationConfirmation {
                    level_name,
                    refunded: refund_id.is_some(),
                },
            )
            .await;

        Ok(CancelSubscriptionResult {
            subscription,
            refund_id,
        })
    }
}
