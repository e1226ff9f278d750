//! InactiveSubscriptionCleanupTask - archives old cancellations and purges dormant rows.
//!
//! Both sweeps run on every pass; a failing archive sweep does not prevent
//! the deletion sweep.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::foundation::Timestamp;
use crate::domain::subscription::SubscriptionStatus;
use crate::ports::{PageRequest, SubscriptionRepository};

use super::{JobReport, ScheduledJob};

pub const DEFAULT_CANCELLED_RETENTION_DAYS: i64 = 90;
pub const DEFAULT_INACTIVE_DELETION_DAYS: i64 = 365;

pub struct InactiveSubscriptionCleanupTask {
    repository: Arc<dyn SubscriptionRepository>,
    cancelled_retention_days: i64,
    inactive_deletion_days: i64,
    batch_size: usize,
}

impl InactiveSubscriptionCleanupTask {
    pub fn new(repository: Arc<dyn SubscriptionRepository>, batch_size: usize) -> Self {
        Self {
            repository,
            cancelled_retention_days: DEFAULT_CANCELLED_RETENTION_DAYS,
            inactive_deletion_days: DEFAULT_INACTIVE_DELETION_DAYS,
            batch_size,
        }
    }

    pub fn with_retention(mut self, cancelled_retention_days: i64, inactive_deletion_days: i64) -> Self {
        self.cancelled_retention_days = cancelled_retention_days;
        self.inactive_deletion_days = inactive_deletion_days;
        self
    }

    async fn archive_cancelled(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);
        let cutoff = now.minus_days(self.cancelled_retention_days);

        loop {
            let batch = match self.repository.find_cancelled_before(cutoff, page).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Cancelled subscriptions query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            let mut page_report = JobReport::empty();
            for mut subscription in batch {
                if let Err(e) = subscription.archive(now) {
                    warn!(subscription_id = %subscription.id, error = %e.message(), "Not archivable");
                    page_report.skip();
                    continue;
                }
                match self.repository.update(&subscription).await {
                    Ok(()) => page_report.success(),
                    Err(e) => {
                        error!(subscription_id = %subscription.id, error = %e, "Archive failed");
                        page_report.failure();
                    }
                }
            }
            page = page.advance(page_report.remaining());
            report.merge(page_report);
        }

        if report.succeeded > 0 {
            info!(archived = report.succeeded, "Archived cancelled subscriptions");
        }
        report
    }

    async fn delete_dormant(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);
        let cutoff = now.minus_days(self.inactive_deletion_days);

        loop {
            let batch = match self
                .repository
                .find_inactive_before(&SubscriptionStatus::DORMANT, cutoff, page)
                .await
            {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Dormant subscriptions query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            let mut page_report = JobReport::empty();
            for subscription in &batch {
                match self.repository.delete(&subscription.id).await {
                    Ok(()) => page_report.success(),
                    Err(e) => {
                        error!(subscription_id = %subscription.id, error = %e, "Delete failed");
                        page_report.failure();
                    }
                }
            }
            page = page.advance(page_report.remaining());
            report.merge(page_report);
        }

        if report.succeeded > 0 {
            info!(deleted = report.succeeded, "Deleted dormant subscriptions");
        }
        report
    }
}

#[async_trait]
impl ScheduledJob for InactiveSubscriptionCleanupTask {
    fn name(&self) -> &'static str {
        "cleanup"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        let mut report = self.archive_cancelled(now).await;
        report.merge(self.delete_dormant(now).await);
        report
    }
}
