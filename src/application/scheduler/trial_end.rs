//! TrialPeriodEndTask - warns about trials ending today and closes lapsed trials.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::application::notifications::NotificationDispatcher;
use crate::application::publishing::publish_after_commit;
use crate::domain::foundation::{EventId, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::subscription::{Subscription, SubscriptionTrialEnded};
use crate::ports::{EventPublisher, PageRequest, SubscriptionRepository};

use super::expiration::count;
use super::{JobReport, ScheduledJob};

pub struct TrialPeriodEndTask {
    repository: Arc<dyn SubscriptionRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
    batch_size: usize,
}

impl TrialPeriodEndTask {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        dispatcher: Arc<NotificationDispatcher>,
        batch_size: usize,
    ) -> Self {
        Self {
            repository,
            event_publisher,
            dispatcher,
            batch_size,
        }
    }

    async fn warn_ending(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);

        loop {
            let batch = match self.repository.find_trial_ending_on(now.date(), page).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Ending trials query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            for subscription in &batch {
                let Some(trial_end_date) = subscription.trial_end_date else {
                    report.skip();
                    continue;
                };
                let kind = NotificationKind::TrialEnding { trial_end_date };
                count(&mut report, self.dispatcher.notify_user(&subscription.user_id, &kind).await);
            }
            page = page.advance(batch.len());
        }

        report
    }

    async fn end_lapsed(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);

        loop {
            let batch = match self
                .repository
                .find_trial_ended_before(now.start_of_day(), page)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Lapsed trials query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            let mut page_report = JobReport::empty();
            for subscription in batch {
                self.end_one(subscription, now, &mut page_report).await;
            }
            page = page.advance(page_report.remaining());
            report.merge(page_report);
        }

        report
    }

    async fn end_one(&self, mut subscription: Subscription, now: Timestamp, report: &mut JobReport) {
        if let Err(e) = subscription.end_trial(now) {
            warn!(subscription_id = %subscription.id, error = %e.message(), "Trial not ended");
            report.skip();
            return;
        }
        if let Err(e) = self.repository.update(&subscription).await {
            error!(subscription_id = %subscription.id, error = %e, "Failed to persist trial end");
            report.failure();
            return;
        }
        report.success();

        let event = SubscriptionTrialEnded {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            ended_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        self.dispatcher
            .notify_user(&subscription.user_id, &NotificationKind::TrialEnded)
            .await;
    }
}

#[async_trait]
impl ScheduledJob for TrialPeriodEndTask {
    fn name(&self) -> &'static str {
        "trial_end"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        let mut report = self.warn_ending(now).await;
        report.merge(self.end_lapsed(now).await);
        report
    }
}
