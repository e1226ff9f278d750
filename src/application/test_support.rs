//! In-memory wiring shared by handler and job tests.

use std::sync::Arc;

use crate::adapters::events::{EventBusAccessControl, InMemoryEventBus};
use crate::adapters::memory::{
    InMemoryFailedEmailRepository, InMemoryLevelRepository, InMemoryPromotionRepository,
    InMemorySubscriptionRepository, InMemoryUserDirectory, InMemoryWatermarkStore,
};
use crate::adapters::notification::{EmailOperationsAlerter, RecordingNotificationGateway};
use crate::adapters::stripe::MockPaymentGateway;
use crate::adapters::sync::RecordingCancellationSink;
use crate::application::notifications::NotificationDispatcher;
use crate::application::sync::DataSynchronizer;
use crate::application::CallDeadline;
use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};
use crate::domain::subscription::{
    BillingFrequency, LevelTier, NewSubscription, Subscription, SubscriptionLevel,
    SubscriptionStatus,
};
use crate::ports::{SubscriptionRepository, UserContact};

pub const USER: &str = "user-1";
pub const USER_EMAIL: &str = "ada@example.com";
pub const ADMIN_EMAIL: &str = "ops@videoflix.example";

pub struct Fixture {
    pub repo: Arc<InMemorySubscriptionRepository>,
    pub levels: Arc<InMemoryLevelRepository>,
    pub promotions: Arc<InMemoryPromotionRepository>,
    pub users: Arc<InMemoryUserDirectory>,
    pub payments: Arc<MockPaymentGateway>,
    pub events: Arc<InMemoryEventBus>,
    pub mail: Arc<RecordingNotificationGateway>,
    pub ops_mail: Arc<RecordingNotificationGateway>,
    pub failed_emails: Arc<InMemoryFailedEmailRepository>,
    pub cancellations: Arc<RecordingCancellationSink>,
    pub watermark: Arc<InMemoryWatermarkStore>,
    /// Monthly Premium plan, 9.99 EUR.
    pub level: SubscriptionLevel,
}

impl Fixture {
    pub async fn new() -> Self {
        let level = SubscriptionLevel::new(
            LevelTier::Premium,
            999,
            "EUR",
            BillingFrequency::Monthly,
            "price_premium",
        )
        .unwrap();
        let levels = Arc::new(InMemoryLevelRepository::new());
        levels.insert(level.clone()).await;

        let users = Arc::new(InMemoryUserDirectory::new());
        users
            .insert(UserContact {
                id: user_id(),
                email: Some(USER_EMAIL.to_string()),
                display_name: "Ada".to_string(),
                push_token: None,
            })
            .await;

        Self {
            repo: Arc::new(InMemorySubscriptionRepository::new()),
            levels,
            promotions: Arc::new(InMemoryPromotionRepository::new()),
            users,
            payments: Arc::new(MockPaymentGateway::new()),
            events: Arc::new(InMemoryEventBus::new()),
            mail: Arc::new(RecordingNotificationGateway::new()),
            ops_mail: Arc::new(RecordingNotificationGateway::new()),
            failed_emails: Arc::new(InMemoryFailedEmailRepository::new()),
            cancellations: Arc::new(RecordingCancellationSink::new()),
            watermark: Arc::new(InMemoryWatermarkStore::new()),
            level,
        }
    }

    pub fn deadline(&self) -> CallDeadline {
        CallDeadline::from_secs(5)
    }

    pub fn dispatcher(&self) -> Arc<NotificationDispatcher> {
        let alerter = Arc::new(EmailOperationsAlerter::new(
            self.ops_mail.clone(),
            vec![ADMIN_EMAIL.to_string()],
        ));
        Arc::new(NotificationDispatcher::new(
            self.mail.clone(),
            self.users.clone(),
            self.failed_emails.clone(),
            alerter,
            self.deadline(),
        ))
    }

    pub fn synchronizer(&self) -> Arc<DataSynchronizer> {
        Arc::new(
            DataSynchronizer::new(self.repo.clone(), self.watermark.clone(), 100, self.deadline())
                .with_cancellation_sink(self.cancellations.clone()),
        )
    }

    pub fn access_control(&self) -> Arc<EventBusAccessControl> {
        Arc::new(EventBusAccessControl::new(self.events.clone()))
    }

    /// Active monthly subscription linked to the payment provider.
    pub fn active_subscription(&self, now: Timestamp) -> Subscription {
        let mut sub = Subscription::create(
            NewSubscription {
                user_id: user_id(),
                level_id: self.level.id,
                initial_status: SubscriptionStatus::Active,
                start_date: now,
                end_date: Some(now.add_months(1)),
                trial_end_date: None,
                auto_renew: true,
                external_customer_id: Some("cus_1".to_string()),
            },
            now,
        )
        .unwrap();
        sub.link_external("sub_ext_1", Some(now.add_months(1)), now);
        sub.external_charge_id = Some("ch_1".to_string());
        sub
    }

    pub async fn store(&self, subscription: &Subscription) {
        self.repo.save(subscription).await.unwrap();
    }

    pub async fn reload(&self, id: &SubscriptionId) -> Subscription {
        self.repo.find_by_id(id).await.unwrap().unwrap()
    }
}

pub fn user_id() -> UserId {
    UserId::new(USER).unwrap()
}
