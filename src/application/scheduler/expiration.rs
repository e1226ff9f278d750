//! ExpirationTask - warns about subscriptions ending today and expires lapsed ones.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::application::notifications::{DispatchOutcome, NotificationDispatcher};
use crate::application::publishing::{level_display_name, lookup_level, publish_after_commit};
use crate::domain::foundation::{EventId, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::subscription::{Subscription, SubscriptionExpired};
use crate::ports::{
    EventPublisher, PageRequest, SubscriptionLevelRepository, SubscriptionRepository,
};

use super::{JobReport, ScheduledJob};

pub struct ExpirationTask {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
    batch_size: usize,
}

impl ExpirationTask {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        dispatcher: Arc<NotificationDispatcher>,
        batch_size: usize,
    ) -> Self {
        Self {
            repository,
            levels,
            event_publisher,
            dispatcher,
            batch_size,
        }
    }

    /// Notifies subscriptions whose end date is today. Nothing is mutated.
    async fn warn_expiring(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);
        let today = now.date();

        loop {
            let batch = match self.repository.find_expiring_on(today, page).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Expiring subscriptions query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            for subscription in &batch {
                let Some(end_date) = subscription.end_date else {
                    report.skip();
                    continue;
                };
                let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
                let kind = NotificationKind::Expiring {
                    level_name: level_display_name(level.as_ref()),
                    end_date,
                };
                count(&mut report, self.dispatcher.notify_user(&subscription.user_id, &kind).await);
            }
            page = page.advance(batch.len());
        }

        report
    }

    /// Expires subscriptions whose end date lies before today.
    async fn expire_lapsed(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);
        let today = now.start_of_day();

        loop {
            let batch = match self.repository.find_ended_before(today, page).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Lapsed subscriptions query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            let mut page_report = JobReport::empty();
            for subscription in batch {
                self.expire_one(subscription, now, &mut page_report).await;
            }
            page = page.advance(page_report.remaining());
            report.merge(page_report);
        }

        report
    }

    async fn expire_one(&self, mut subscription: Subscription, now: Timestamp, report: &mut JobReport) {
        let previous_status = subscription.status;
        if let Err(e) = subscription.expire(now) {
            warn!(
                subscription_id = %subscription.id,
                status = %previous_status,
                error = %e.message(),
                "Subscription cannot expire, skipped"
            );
            report.skip();
            return;
        }
        if let Err(e) = self.repository.update(&subscription).await {
            error!(subscription_id = %subscription.id, error = %e, "Failed to persist expiry");
            report.failure();
            return;
        }
        report.success();

        let event = SubscriptionExpired {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            previous_status,
            expired_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
        self.dispatcher
            .notify_user(
                &subscription.user_id,
                &NotificationKind::Expired {
                    level_name: level_display_name(level.as_ref()),
                },
            )
            .await;
    }
}

/// Counts a notification-only item.
pub(super) fn count(report: &mut JobReport, outcome: DispatchOutcome) {
    match outcome {
        DispatchOutcome::Sent => report.success(),
        DispatchOutcome::Skipped => report.skip(),
        DispatchOutcome::Failed(_) => report.failure(),
    }
}

#[async_trait]
impl ScheduledJob for ExpirationTask {
    fn name(&self) -> &'static str {
        "expiration"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        let mut report = self.warn_expiring(now).await;
        report.merge(self.expire_lapsed(now).await);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::subscription::SubscriptionStatus;

    fn task(fx: &Fixture, batch_size: usize) -> ExpirationTask {
        ExpirationTask::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.events.clone(),
            fx.dispatcher(),
            batch_size,
        )
    }

    async fn ending(fx: &Fixture, now: Timestamp, end_offset_days: i64) -> Subscription {
        let mut sub = fx.active_subscription(now);
        sub.end_date = Some(now.add_days(end_offset_days));
        fx.store(&sub).await;
        sub
    }

    #[tokio::test]
    async fn expires_lapsed_and_warns_expiring() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let lapsed = ending(&fx, now, -2).await;
        let today = ending(&fx, now, 0).await;
        let later = ending(&fx, now, 10).await;

        let report = task(&fx, 10).run(now).await;

        assert_eq!(report.succeeded, 2);
        assert_eq!(fx.reload(&lapsed.id).await.status, SubscriptionStatus::Expired);
        assert_eq!(fx.reload(&today.id).await.status, SubscriptionStatus::Active);
        assert_eq!(fx.reload(&later.id).await.status, SubscriptionStatus::Active);

        let subjects: Vec<_> = fx.mail.delivered().into_iter().map(|m| m.subject).collect();
        assert!(subjects.contains(&"Your Premium subscription expires soon".to_string()));
        assert!(subjects.contains(&"Your Premium subscription has expired".to_string()));

        let events = fx.events.events_of_type("subscription.expired.v1");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].payload["previous_status"], "active");
    }

    #[tokio::test]
    async fn write_failure_does_not_stop_the_batch() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut ids = Vec::new();
        for _ in 0..4 {
            ids.push(ending(&fx, now, -3).await.id);
        }
        fx.repo.fail_updates_for(ids[1]).await;

        let report = task(&fx, 2).run(now).await;

        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 1);
        for id in &ids {
            let expected = if *id == ids[1] {
                SubscriptionStatus::Active
            } else {
                SubscriptionStatus::Expired
            };
            assert_eq!(fx.reload(id).await.status, expected);
        }
    }

    #[tokio::test]
    async fn notification_failure_does_not_stop_the_batch() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut ids = Vec::new();
        for _ in 0..3 {
            ids.push(ending(&fx, now, -1).await.id);
        }
        fx.mail.fail_next(1, "smtp down");

        let report = task(&fx, 10).run(now).await;

        assert_eq!(report.succeeded, 3);
        assert!(!report.aborted);
        for id in &ids {
            assert_eq!(fx.reload(id).await.status, SubscriptionStatus::Expired);
        }
        assert_eq!(fx.mail.attempts().len(), 3);
        assert_eq!(fx.mail.delivered_with_subject("has expired").len(), 2);
    }

    #[tokio::test]
    async fn cancelled_subscriptions_expire_too() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut sub = fx.active_subscription(now);
        sub.cancel(now).unwrap();
        sub.end_date = Some(now.minus_days(1));
        fx.store(&sub).await;

        task(&fx, 10).run(now).await;

        assert_eq!(fx.reload(&sub.id).await.status, SubscriptionStatus::Expired);
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        ending(&fx, now, -2).await;
        let task = task(&fx, 10);
        task.run(now).await;

        let again = task.run(now).await;

        assert_eq!(again, JobReport::empty());
    }
}
