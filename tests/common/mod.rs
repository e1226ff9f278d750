//! In-memory wiring shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use videoflix_billing::adapters::events::{EventBusAccessControl, InMemoryEventBus};
use videoflix_billing::adapters::memory::{
    InMemoryFailedEmailRepository, InMemoryLevelRepository, InMemoryMetricsStore,
    InMemoryPromotionRepository, InMemorySubscriptionRepository, InMemoryUserDirectory,
    InMemoryWatermarkStore,
};
use videoflix_billing::adapters::notification::{
    EmailOperationsAlerter, RecordingNotificationGateway,
};
use videoflix_billing::adapters::stripe::MockPaymentGateway;
use videoflix_billing::adapters::sync::{RecordingCancellationSink, RecordingSyncEndpoint};
use videoflix_billing::application::handlers::{
    CancelSubscriptionHandler, ChangeSubscriptionLevelHandler, CreateSubscriptionHandler,
    ReactivateSubscriptionHandler, RecordPaymentFailureHandler, RecordPaymentSuccessHandler,
    RecordRenewalHandler,
};
use videoflix_billing::application::{CallDeadline, DataSynchronizer, NotificationDispatcher};
use videoflix_billing::domain::foundation::{SubscriptionId, UserId};
use videoflix_billing::domain::subscription::{
    BillingFrequency, LevelTier, Subscription, SubscriptionLevel,
};
use videoflix_billing::ports::{SubscriptionRepository, UserContact};

pub const USER_EMAIL: &str = "grace@example.com";
pub const ADMIN_EMAIL: &str = "ops@videoflix.example";

/// Every port backed by an in-memory or recording adapter.
pub struct World {
    pub repo: Arc<InMemorySubscriptionRepository>,
    pub levels: Arc<InMemoryLevelRepository>,
    pub promotions: Arc<InMemoryPromotionRepository>,
    pub users: Arc<InMemoryUserDirectory>,
    pub payments: Arc<MockPaymentGateway>,
    pub events: Arc<InMemoryEventBus>,
    pub mail: Arc<RecordingNotificationGateway>,
    pub ops_mail: Arc<RecordingNotificationGateway>,
    pub failed_emails: Arc<InMemoryFailedEmailRepository>,
    pub metrics: Arc<InMemoryMetricsStore>,
    pub watermark: Arc<InMemoryWatermarkStore>,
    pub crm: Arc<RecordingSyncEndpoint>,
    pub cancellations: Arc<RecordingCancellationSink>,
    pub basic: SubscriptionLevel,
    pub premium: SubscriptionLevel,
}

impl World {
    pub async fn new() -> Self {
        let basic = SubscriptionLevel::new(
            LevelTier::Basic,
            499,
            "EUR",
            BillingFrequency::Monthly,
            "price_basic",
        )
        .unwrap();
        let premium = SubscriptionLevel::new(
            LevelTier::Premium,
            999,
            "EUR",
            BillingFrequency::Monthly,
            "price_premium",
        )
        .unwrap();
        let levels = Arc::new(InMemoryLevelRepository::new());
        levels.insert(basic.clone()).await;
        levels.insert(premium.clone()).await;

        let users = Arc::new(InMemoryUserDirectory::new());
        users
            .insert(UserContact {
                id: user_id(),
                email: Some(USER_EMAIL.to_string()),
                display_name: "Grace".to_string(),
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
            metrics: Arc::new(InMemoryMetricsStore::new()),
            watermark: Arc::new(InMemoryWatermarkStore::new()),
            crm: Arc::new(RecordingSyncEndpoint::new("crm")),
            cancellations: Arc::new(RecordingCancellationSink::new()),
            basic,
            premium,
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
            DataSynchronizer::new(self.repo.clone(), self.watermark.clone(), 50, self.deadline())
                .with_endpoint(self.crm.clone())
                .with_cancellation_sink(self.cancellations.clone()),
        )
    }

    pub fn create_handler(&self) -> CreateSubscriptionHandler {
        CreateSubscriptionHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.users.clone(),
            self.payments.clone(),
            self.events.clone(),
            self.dispatcher(),
            self.deadline(),
        )
    }

    pub fn change_level_handler(&self) -> ChangeSubscriptionLevelHandler {
        ChangeSubscriptionLevelHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.events.clone(),
            self.dispatcher(),
        )
    }

    pub fn cancel_handler(&self) -> CancelSubscriptionHandler {
        CancelSubscriptionHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.payments.clone(),
            self.events.clone(),
            Arc::new(EventBusAccessControl::new(self.events.clone())),
            self.synchronizer(),
            self.dispatcher(),
            self.deadline(),
        )
    }

    pub fn reactivate_handler(&self) -> ReactivateSubscriptionHandler {
        ReactivateSubscriptionHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.events.clone(),
            Arc::new(EventBusAccessControl::new(self.events.clone())),
        )
    }

    pub fn failure_handler(&self) -> Arc<RecordPaymentFailureHandler> {
        Arc::new(RecordPaymentFailureHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.events.clone(),
            self.dispatcher(),
        ))
    }

    pub fn success_handler(&self) -> Arc<RecordPaymentSuccessHandler> {
        Arc::new(RecordPaymentSuccessHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.events.clone(),
            self.dispatcher(),
        ))
    }

    pub fn renewal_handler(&self) -> Arc<RecordRenewalHandler> {
        Arc::new(RecordRenewalHandler::new(
            self.repo.clone(),
            self.levels.clone(),
            self.events.clone(),
        ))
    }

    pub async fn store(&self, subscription: &Subscription) {
        self.repo.save(subscription).await.unwrap();
    }

    pub async fn reload(&self, id: &SubscriptionId) -> Subscription {
        self.repo.find_by_id(id).await.unwrap().unwrap()
    }
}

pub fn user_id() -> UserId {
    UserId::new("user-42").unwrap()
}
