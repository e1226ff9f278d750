//! RenewalTask - charges auto-renewing subscriptions that are due.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::application::handlers::{RecordRenewalCommand, RecordRenewalHandler};
use crate::application::publishing::lookup_level;
use crate::application::CallDeadline;
use crate::domain::foundation::Timestamp;
use crate::domain::subscription::Subscription;
use crate::ports::{PageRequest, PaymentGateway, SubscriptionLevelRepository, SubscriptionRepository};

use super::{JobReport, ScheduledJob};

pub struct RenewalTask {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    payments: Arc<dyn PaymentGateway>,
    renewals: Arc<RecordRenewalHandler>,
    deadline: CallDeadline,
    batch_size: usize,
}

impl RenewalTask {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        payments: Arc<dyn PaymentGateway>,
        renewals: Arc<RecordRenewalHandler>,
        deadline: CallDeadline,
        batch_size: usize,
    ) -> Self {
        Self {
            repository,
            levels,
            payments,
            renewals,
            deadline,
            batch_size,
        }
    }

    async fn renew(&self, subscription: &Subscription, now: Timestamp, report: &mut JobReport) {
        if !subscription.is_renewable() {
            warn!(
                subscription_id = %subscription.id,
                status = %subscription.status,
                "Subscription no longer renewable, renewal skipped"
            );
            report.skip();
            return;
        }
        let Some(customer) = subscription.external_customer_id.as_deref() else {
            warn!(subscription_id = %subscription.id, "No payment customer, renewal skipped");
            report.skip();
            return;
        };
        let Some(level) = lookup_level(self.levels.as_ref(), &subscription.level_id).await else {
            warn!(subscription_id = %subscription.id, "Unknown level, renewal skipped");
            report.skip();
            return;
        };

        let created = match self
            .deadline
            .payment(
                self.payments
                    .create_subscription(customer, &level.external_price_id),
            )
            .await
        {
            Ok(created) => created,
            Err(e) => {
                error!(
                    subscription_id = %subscription.id,
                    error = %e,
                    "Renewal charge failed"
                );
                report.failure();
                return;
            }
        };

        let recorded = self
            .renewals
            .handle(RecordRenewalCommand {
                subscription_id: subscription.id,
                external_subscription_id: created.subscription_ref,
                charge_ref: created.latest_charge_ref,
                renewed_at: now,
            })
            .await;
        match recorded {
            Ok(_) => report.success(),
            Err(e) => {
                error!(
                    subscription_id = %subscription.id,
                    error = %e.message(),
                    "Renewal charged but not recorded"
                );
                report.failure();
            }
        }
    }
}

#[async_trait]
impl ScheduledJob for RenewalTask {
    fn name(&self) -> &'static str {
        "renewal"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        let mut report = JobReport::empty();
        let mut page = PageRequest::first(self.batch_size);

        loop {
            let batch = match self.repository.find_due_for_renewal(now, page).await {
                Ok(batch) => batch,
                Err(e) => {
                    error!(error = %e, "Renewal query failed");
                    report.aborted = true;
                    break;
                }
            };
            if batch.is_empty() {
                break;
            }

            let mut page_report = JobReport::empty();
            for subscription in &batch {
                self.renew(subscription, now, &mut page_report).await;
            }
            // Renewed rows leave the query; the rest are still due.
            page = page.advance(page_report.remaining());
            report.merge(page_report);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::Fixture;
    use crate::domain::subscription::SubscriptionStatus;
    use crate::ports::GatewayError;

    fn task(fx: &Fixture, batch_size: usize) -> RenewalTask {
        let renewals = Arc::new(RecordRenewalHandler::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.events.clone(),
        ));
        RenewalTask::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.payments.clone(),
            renewals,
            fx.deadline(),
            batch_size,
        )
    }

    async fn due(fx: &Fixture, now: Timestamp, customer: &str) -> Subscription {
        let mut sub = fx.active_subscription(now);
        sub.external_customer_id = Some(customer.to_string());
        sub.next_renewal_date = Some(now.minus_days(1));
        fx.store(&sub).await;
        sub
    }

    #[tokio::test]
    async fn renews_every_due_subscription_across_pages() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut ids = Vec::new();
        for i in 0..5 {
            ids.push(due(&fx, now, &format!("cus_{}", i)).await.id);
        }

        let report = task(&fx, 2).run(now).await;

        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed, 0);
        assert_eq!(fx.payments.call_count("create_subscription"), 5);
        for id in ids {
            let stored = fx.reload(&id).await;
            assert!(stored.next_renewal_date.unwrap().is_after(&now));
            assert!(stored
                .external_subscription_id
                .unwrap()
                .starts_with("sub_mock_"));
            assert!(stored.external_charge_id.unwrap().starts_with("ch_mock_"));
        }
        assert_eq!(fx.events.events_of_type("subscription.renewed.v1").len(), 5);
    }

    #[tokio::test]
    async fn gateway_failure_is_isolated() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let bad = due(&fx, now, "cus_bad").await;
        let good = due(&fx, now, "cus_good").await;
        fx.payments.set_argument_error(
            "create_subscription",
            "cus_bad",
            GatewayError::card_declined("declined"),
        );

        let report = task(&fx, 1).run(now).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 1);
        assert!(!report.aborted);
        assert_eq!(fx.reload(&bad.id).await.next_renewal_date, bad.next_renewal_date);
        assert!(fx.reload(&good.id).await.next_renewal_date.unwrap().is_after(&now));
        assert_eq!(fx.reload(&bad.id).await.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn missing_customer_is_skipped() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut sub = due(&fx, now, "cus_x").await;
        sub.external_customer_id = None;
        fx.repo.update(&sub).await.unwrap();

        let report = task(&fx, 10).run(now).await;

        assert_eq!(report.skipped, 1);
        assert!(!fx.payments.was_called("create_subscription"));
    }

    #[tokio::test]
    async fn nothing_due_is_an_empty_run() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut sub = fx.active_subscription(now);
        sub.next_renewal_date = Some(now.add_days(3));
        fx.store(&sub).await;

        let report = task(&fx, 10).run(now).await;

        assert_eq!(report, JobReport::empty());
    }

    #[tokio::test]
    async fn cancelled_overdue_subscription_is_not_charged() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut sub = due(&fx, now, "cus_gone").await;
        sub.status = SubscriptionStatus::Cancelled;
        sub.end_date = Some(now.minus_days(2));
        fx.repo.update(&sub).await.unwrap();
        let renewing = due(&fx, now, "cus_live").await;

        let report = task(&fx, 10).run(now).await;

        assert_eq!(report.succeeded, 1);
        assert_eq!(fx.payments.call_count("create_subscription"), 1);
        assert!(fx
            .payments
            .calls()
            .iter()
            .all(|c| c.args.first().map(String::as_str) != Some("cus_gone")));
        let stored = fx.reload(&sub.id).await;
        assert_eq!(stored.status, SubscriptionStatus::Cancelled);
        assert_eq!(stored.next_renewal_date, sub.next_renewal_date);
        assert!(fx.reload(&renewing.id).await.next_renewal_date.unwrap().is_after(&now));
    }

    #[tokio::test]
    async fn status_change_after_query_is_skipped() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let mut sub = due(&fx, now, "cus_x").await;
        sub.status = SubscriptionStatus::PaymentFailed;
        let mut report = JobReport::empty();

        task(&fx, 10).renew(&sub, now, &mut report).await;

        assert_eq!(report.skipped, 1);
        assert!(!fx.payments.was_called("create_subscription"));
    }
}
