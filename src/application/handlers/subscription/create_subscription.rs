//! CreateSubscriptionHandler - Command handler for purchasing a subscription.

use std::sync::Arc;

use tracing::{error, info};

use crate::application::notifications::{NotificationDispatcher, WelcomeOutcome};
use crate::application::publishing::publish_after_commit;
use crate::application::CallDeadline;
use crate::domain::foundation::{EventId, SubscriptionLevelId, Timestamp, UserId};
use crate::domain::subscription::{
    BillingCalculator, NewSubscription, Subscription, SubscriptionCreated, SubscriptionError,
    SubscriptionStatus,
};
use crate::ports::{
    EventPublisher, PaymentGateway, SubscriptionLevelRepository, SubscriptionRepository,
    UserDirectory,
};

/// Command to create a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionCommand {
    pub user_id: UserId,
    pub level_id: SubscriptionLevelId,
    /// Trial or Active.
    pub initial_status: SubscriptionStatus,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub trial_end_date: Option<Timestamp>,
    pub auto_renew: bool,
    /// Payment provider customer reference.
    pub external_customer_id: Option<String>,
}

/// Result of successful creation.
#[derive(Debug, Clone)]
pub struct CreateSubscriptionResult {
    pub subscription: Subscription,
    pub welcome: WelcomeOutcome,
}

/// Handler for creating subscriptions.
///
/// The external subscription is created before the local row so the stored
/// subscription always carries its provider reference.
pub struct CreateSubscriptionHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    users: Arc<dyn UserDirectory>,
    payments: Arc<dyn PaymentGateway>,
    event_publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
    deadline: CallDeadline,
}

impl CreateSubscriptionHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        users: Arc<dyn UserDirectory>,
        payments: Arc<dyn PaymentGateway>,
        event_publisher: Arc<dyn EventPublisher>,
        dispatcher: Arc<NotificationDispatcher>,
        deadline: CallDeadline,
    ) -> Self {
        Self {
            repository,
            levels,
            users,
            payments,
            event_publisher,
            dispatcher,
            deadline,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateSubscriptionCommand,
    ) -> Result<CreateSubscriptionResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Owning user and plan must exist
        if self.users.find_by_id(&cmd.user_id).await?.is_none() {
            return Err(SubscriptionError::validation("user_id", "user does not exist"));
        }
        let level = self
            .levels
            .find_by_id(&cmd.level_id)
            .await?
            .ok_or_else(|| {
                SubscriptionError::validation("level_id", "subscription level does not exist")
            })?;

        let customer_ref = cmd
            .external_customer_id
            .clone()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                SubscriptionError::validation("external_customer_id", "payment customer is required")
            })?;

        // 2. Domain validation (dates, initial status)
        let mut subscription = Subscription::create(
            NewSubscription {
                user_id: cmd.user_id.clone(),
                level_id: cmd.level_id,
                initial_status: cmd.initial_status,
                start_date: cmd.start_date,
                end_date: cmd.end_date,
                trial_end_date: cmd.trial_end_date,
                auto_renew: cmd.auto_renew,
                external_customer_id: Some(customer_ref.clone()),
            },
            now,
        )?;

        // 3. External subscription, with trial when starting in Trial
        let created = match (subscription.status, subscription.trial_end_date) {
            (SubscriptionStatus::Trial, Some(trial_end)) => {
                self.deadline
                    .payment(self.payments.create_subscription_with_trial(
                        &customer_ref,
                        &level.external_price_id,
                        trial_end,
                    ))
                    .await?
            }
            _ => {
                self.deadline
                    .payment(
                        self.payments
                            .create_subscription(&customer_ref, &level.external_price_id),
                    )
                    .await?
            }
        };

        // 4. Provider references and first billing date
        let next_billing = BillingCalculator::next_billing_date(&subscription, Some(&level));
        subscription.link_external(created.subscription_ref.clone(), next_billing, now);
        if let Some(charge_ref) = created.latest_charge_ref {
            subscription.record_charge(charge_ref, now);
        }
        if subscription.auto_renew {
            subscription.next_renewal_date = next_billing.or(subscription.end_date);
        }

        // 5. Persist
        if let Err(e) = self.repository.save(&subscription).await {
            error!(
                subscription_id = %subscription.id,
                user_id = %subscription.user_id,
                external_subscription_id = %created.subscription_ref,
                error = %e,
                "Subscription save failed, provider subscription has no local row"
            );
            return Err(e.into());
        }

        info!(
            subscription_id = %subscription.id,
            user_id = %subscription.user_id,
            status = %subscription.status,
            "Subscription created"
        );

        // 6. Publish event
        let event = SubscriptionCreated {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            level_id: subscription.level_id,
            status: subscription.status,
            next_billing_date: subscription.next_billing_date,
            created_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        // 7. Welcome email with retry/escalation
        let welcome = self
            .dispatcher
            .send_welcome(&subscription.user_id, &subscription.id, level.name(), now)
            .await;

        Ok(CreateSubscriptionResult {
            subscription,
            welcome,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{user_id, Fixture, USER_EMAIL};
    use crate::domain::subscription::{BillingFrequency, LevelTier, SubscriptionLevel};
    use crate::ports::GatewayError;

    fn handler(fx: &Fixture) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.users.clone(),
            fx.payments.clone(),
            fx.events.clone(),
            fx.dispatcher(),
            fx.deadline(),
        )
    }

    fn command(fx: &Fixture, status: SubscriptionStatus) -> CreateSubscriptionCommand {
        let start = Timestamp::now();
        CreateSubscriptionCommand {
            user_id: user_id(),
            level_id: fx.level.id,
            initial_status: status,
            start_date: start,
            end_date: Some(start.add_months(1)),
            trial_end_date: Some(start.add_days(14)),
            auto_renew: true,
            external_customer_id: Some("cus_1".to_string()),
        }
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Success Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn creates_active_subscription_with_billing_date() {
        let fx = Fixture::new().await;
        let cmd = command(&fx, SubscriptionStatus::Active);
        let start = cmd.start_date;

        let result = handler(&fx).handle(cmd).await.unwrap();

        let sub = fx.reload(&result.subscription.id).await;
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.next_billing_date, Some(start.add_months(1)));
        assert_eq!(sub.next_renewal_date, sub.next_billing_date);
        assert!(sub
            .external_subscription_id
            .as_deref()
            .unwrap()
            .starts_with("sub_mock_"));
        assert!(sub.external_charge_id.as_deref().unwrap().starts_with("ch_mock_"));
        assert_eq!(fx.payments.call_count("create_subscription"), 1);
        assert!(!fx.payments.was_called("create_subscription_with_trial"));
    }

    #[tokio::test]
    async fn trial_uses_trial_subscription() {
        let fx = Fixture::new().await;

        let result = handler(&fx)
            .handle(command(&fx, SubscriptionStatus::Trial))
            .await
            .unwrap();

        assert_eq!(result.subscription.status, SubscriptionStatus::Trial);
        assert_eq!(fx.payments.call_count("create_subscription_with_trial"), 1);
        assert_eq!(fx.payments.calls()[0].args[1], "price_premium");
        assert!(fx.reload(&result.subscription.id).await.external_charge_id.is_none());
    }

    #[tokio::test]
    async fn publishes_created_event_and_sends_welcome() {
        let fx = Fixture::new().await;

        let result = handler(&fx)
            .handle(command(&fx, SubscriptionStatus::Active))
            .await
            .unwrap();

        assert!(fx.events.has_event("subscription.created.v1"));
        assert_eq!(result.welcome, WelcomeOutcome::Delivered { attempts: 1 });
        let welcome = fx.mail.delivered_with_subject("Welcome");
        assert_eq!(welcome.len(), 1);
        assert_eq!(welcome[0].to, USER_EMAIL);
    }

    #[tokio::test]
    async fn welcome_escalation_does_not_fail_creation() {
        let fx = Fixture::new().await;
        fx.mail.fail_next(3, "smtp down");

        let result = handler(&fx)
            .handle(command(&fx, SubscriptionStatus::Active))
            .await
            .unwrap();

        assert!(matches!(result.welcome, WelcomeOutcome::Escalated { attempts: 3, .. }));
        assert_eq!(fx.failed_emails.records().await.len(), 1);
        assert_eq!(fx.ops_mail.delivered().len(), 1);
    }

    #[tokio::test]
    async fn undetermined_frequency_leaves_billing_date_empty() {
        let fx = Fixture::new().await;
        let mut legacy = SubscriptionLevel::new(
            LevelTier::Basic,
            499,
            "eur",
            BillingFrequency::Monthly,
            "price_legacy",
        )
        .unwrap();
        legacy.billing_frequency = None;
        fx.levels.insert(legacy.clone()).await;
        let mut cmd = command(&fx, SubscriptionStatus::Active);
        cmd.level_id = legacy.id;

        let result = handler(&fx).handle(cmd).await.unwrap();

        assert_eq!(result.subscription.next_billing_date, None);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Validation Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn unknown_user_is_validation_error() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, SubscriptionStatus::Active);
        cmd.user_id = UserId::new("ghost").unwrap();

        let err = handler(&fx).handle(cmd).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Validation { ref field, .. } if field == "user_id"));
        assert!(!fx.payments.was_called("create_subscription"));
    }

    #[tokio::test]
    async fn unknown_level_is_validation_error() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, SubscriptionStatus::Active);
        cmd.level_id = SubscriptionLevelId::new();

        let err = handler(&fx).handle(cmd).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Validation { ref field, .. } if field == "level_id"));
    }

    #[tokio::test]
    async fn past_start_date_is_rejected() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, SubscriptionStatus::Active);
        cmd.start_date = Timestamp::now().minus_days(2);

        let err = handler(&fx).handle(cmd).await.unwrap_err();

        assert!(matches!(err, SubscriptionError::Validation { .. }));
        assert!(fx.repo.all().await.is_empty());
    }

    #[tokio::test]
    async fn end_before_start_is_rejected() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, SubscriptionStatus::Active);
        cmd.end_date = Some(cmd.start_date.minus_days(1));

        assert!(handler(&fx).handle(cmd).await.is_err());
    }

    #[tokio::test]
    async fn missing_customer_is_rejected() {
        let fx = Fixture::new().await;
        let mut cmd = command(&fx, SubscriptionStatus::Active);
        cmd.external_customer_id = None;

        let err = handler(&fx).handle(cmd).await.unwrap_err();

        assert!(
            matches!(err, SubscriptionError::Validation { ref field, .. } if field == "external_customer_id")
        );
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Failure Tests
    // ════════════════════════════════════════════════════════════════════════════

    #[tokio::test]
    async fn gateway_failure_stores_nothing() {
        let fx = Fixture::new().await;
        fx.payments
            .set_method_error("create_subscription", GatewayError::card_declined("insufficient funds"));

        let err = handler(&fx)
            .handle(command(&fx, SubscriptionStatus::Active))
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::Gateway { .. }));
        assert!(fx.repo.all().await.is_empty());
        assert_eq!(fx.events.event_count(), 0);
        assert!(fx.mail.attempts().is_empty());
    }

    #[tokio::test]
    async fn save_failure_after_provider_call_is_reported() {
        let fx = Fixture::new().await;
        fx.repo.fail_saves(true).await;

        let err = handler(&fx)
            .handle(command(&fx, SubscriptionStatus::Active))
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::Persistence(_)));
        assert_eq!(fx.payments.call_count("create_subscription"), 1);
        assert!(fx.repo.all().await.is_empty());
        assert_eq!(fx.events.event_count(), 0);
        assert!(fx.mail.attempts().is_empty());
    }
}
