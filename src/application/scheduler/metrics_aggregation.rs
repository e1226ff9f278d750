//! SubscriptionMetricsAggregationTask - records yesterday's subscription metrics.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::application::publishing::lookup_level;
use crate::domain::foundation::{DomainError, SubscriptionLevelId, Timestamp};
use crate::domain::subscription::{DailyMetrics, SubscriptionStatus};
use crate::ports::{MetricsStore, PageRequest, SubscriptionLevelRepository, SubscriptionRepository};

use super::{JobReport, ScheduledJob};

pub struct SubscriptionMetricsAggregationTask {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    store: Arc<dyn MetricsStore>,
    enabled: bool,
    batch_size: usize,
}

impl SubscriptionMetricsAggregationTask {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        store: Arc<dyn MetricsStore>,
        enabled: bool,
        batch_size: usize,
    ) -> Self {
        Self {
            repository,
            levels,
            store,
            enabled,
            batch_size,
        }
    }

    /// Computes the metrics of the UTC day before `now`.
    pub async fn aggregate(&self, now: Timestamp) -> Result<DailyMetrics, DomainError> {
        let day_end = now.start_of_day();
        let day_start = day_end.minus_days(1);
        let mut metrics = DailyMetrics::empty(day_start.date());

        // Prices are looked up once per level.
        let mut prices: HashMap<SubscriptionLevelId, i64> = HashMap::new();
        let mut page = PageRequest::first(self.batch_size);
        loop {
            let batch = self
                .repository
                .find_created_between(day_start, day_end, page)
                .await?;
            if batch.is_empty() {
                break;
            }
            for subscription in &batch {
                let price = match prices.get(&subscription.level_id) {
                    Some(price) => *price,
                    None => {
                        let price = lookup_level(self.levels.as_ref(), &subscription.level_id)
                            .await
                            .map(|l| l.price_cents)
                            .unwrap_or(0);
                        prices.insert(subscription.level_id, price);
                        price
                    }
                };
                metrics.new_subscriptions += 1;
                metrics.daily_revenue_cents += price;
            }
            page = page.advance(batch.len());
        }

        metrics.cancelled_subscriptions = self
            .repository
            .count_cancelled_between(day_start, day_end)
            .await?;
        metrics.active_subscriptions_end = self
            .repository
            .count_by_status(SubscriptionStatus::Active)
            .await?;

        Ok(metrics)
    }
}

#[async_trait]
impl ScheduledJob for SubscriptionMetricsAggregationTask {
    fn name(&self) -> &'static str {
        "metrics_aggregation"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        if !self.enabled {
            warn!("Metrics aggregation disabled, skipping run");
            return JobReport::empty();
        }

        let mut report = JobReport::empty();
        let recorded = match self.aggregate(now).await {
            Ok(metrics) => self.store.record(&metrics).await.map(|_| metrics),
            Err(e) => Err(e),
        };
        match recorded {
            Ok(metrics) => {
                info!(
                    day = %metrics.day,
                    new_subscriptions = metrics.new_subscriptions,
                    cancelled_subscriptions = metrics.cancelled_subscriptions,
                    daily_revenue_cents = metrics.daily_revenue_cents,
                    active_subscriptions_end = metrics.active_subscriptions_end,
                    "Daily metrics recorded"
                );
                report.success();
            }
            Err(e) => {
                error!(error = %e, "Metrics aggregation failed");
                report.failure();
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryMetricsStore;
    use crate::application::test_support::Fixture;

    fn task(
        fx: &Fixture,
        store: Arc<InMemoryMetricsStore>,
        enabled: bool,
    ) -> SubscriptionMetricsAggregationTask {
        SubscriptionMetricsAggregationTask::new(
            fx.repo.clone(),
            fx.levels.clone(),
            store,
            enabled,
            2,
        )
    }

    #[tokio::test]
    async fn aggregates_yesterday() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let yesterday = now.start_of_day().minus_days(1);

        for i in 0..3 {
            let mut sub = fx.active_subscription(now);
            sub.created_at = yesterday;
            if i == 0 {
                sub.cancel(yesterday).unwrap();
            }
            fx.store(&sub).await;
        }
        // Created today, not counted as new.
        fx.store(&fx.active_subscription(now)).await;

        let store = Arc::new(InMemoryMetricsStore::new());
        let report = task(&fx, store.clone(), true).run(now).await;

        assert_eq!(report.succeeded, 1);
        let metrics = store.get(yesterday.date()).await.unwrap();
        assert_eq!(metrics.new_subscriptions, 3);
        assert_eq!(metrics.daily_revenue_cents, 3 * 999);
        assert_eq!(metrics.cancelled_subscriptions, 1);
        assert_eq!(metrics.active_subscriptions_end, 3);
    }

    #[tokio::test]
    async fn disabled_task_records_nothing() {
        let fx = Fixture::new().await;
        let now = Timestamp::now();
        let store = Arc::new(InMemoryMetricsStore::new());

        let report = task(&fx, store.clone(), false).run(now).await;

        assert_eq!(report, JobReport::empty());
        assert!(store.get(now.minus_days(1).date()).await.is_none());
    }
}
