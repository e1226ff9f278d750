//! PaymentReminderTask - reminds subscribers of an upcoming charge.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;

use crate::application::notifications::NotificationDispatcher;
use crate::application::publishing::{level_display_name, lookup_level};
use crate::domain::foundation::Timestamp;
use crate::domain::notification::NotificationKind;
use crate::ports::{PageRequest, SubscriptionLevelRepository, SubscriptionRepository};

use super::expiration::count;
use super::{JobReport, ScheduledJob};

/// Days between the reminder and the billing date.
pub const DEFAULT_REMINDER_DAYS_BEFORE: i64 = 3;

pub struct PaymentReminderTask {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    days_before: i64,
    batch_size: usize,
}

impl PaymentReminderTask {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        batch_size: usize,
    ) -> Self {
        Self {
            repository,
            levels,
            dispatcher,
            days_before: DEFAULT_REMINDER_DAYS_BEFORE,
            batch_size,
        }
    }

    pub fn with_days_before(mut self, days: i64) -> Self {
        self.days_before = days;
        self
    }
}

#[async_trait]
impl ScheduledJob for PaymentReminderTask {
    fn name(&self) -> &'static str {
        "payment_reminder"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);
        let billing_day = now.add_days(self.days_before);

        loop {
            let batch = match self
                .repository
                .find_billing_on(billing_day.date(), page)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Billing date query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            for subscription in &batch {
                let level = lookup_level(self.levels.as_ref(), &subscription.level_id).await;
                let kind = NotificationKind::RenewalReminder {
                    level_name: level_display_name(level.as_ref()),
                    billing_date: subscription.next_billing_date.unwrap_or(billing_day),
                    days_before: self.days_before,
                };
                count(&mut report, self.dispatcher.notify_user(&subscription.user_id, &kind).await);
            }
            page = page.advance(batch.len());
        }

        report
    }
}
