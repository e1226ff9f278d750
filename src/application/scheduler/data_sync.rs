//! DataSynchronizationTask - pushes changed subscriptions to downstream systems.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::application::sync::DataSynchronizer;
use crate::domain::foundation::Timestamp;

use super::{JobReport, ScheduledJob};

pub struct DataSynchronizationTask {
    synchronizer: Arc<DataSynchronizer>,
    enabled: bool,
}

impl DataSynchronizationTask {
    pub fn new(synchronizer: Arc<DataSynchronizer>, enabled: bool) -> Self {
        Self {
            synchronizer,
            enabled,
        }
    }
}

#[async_trait]
impl ScheduledJob for DataSynchronizationTask {
    fn name(&self) -> &'static str {
        "data_sync"
    }

    async fn run(&self, now: Timestamp) -> JobReport {
        if !self.enabled {
            warn!("Data synchronization disabled, skipping run");
            return JobReport::empty();
        }

        match self.synchronizer.synchronize_since_watermark(now).await {
            Ok(sync) => JobReport {
                processed: sync.synced,
                succeeded: if sync.watermark_advanced { sync.synced } else { 0 },
                failed: sync.endpoint_failures,
                skipped: 0,
                aborted: false,
            },
            Err(e) => {
                error!(error = %e, "Data synchronization failed");
                JobReport {
                    aborted: true,
                    ..JobReport::empty()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::adapters::sync::RecordingSyncEndpoint;
    use crate::application::sync::WATERMARK_OVERLAP_MINUTES;
    use crate::application::test_support::Fixture;
    use crate::ports::SyncWatermarkStore;

    #[tokio::test]
    async fn disabled_task_does_nothing() {
        let fx = Fixture::new().await;
        let endpoint = Arc::new(RecordingSyncEndpoint::new("crm"));
        let synchronizer = Arc::new(
            DataSynchronizer::new(fx.repo.clone(), fx.watermark.clone(), 10, fx.deadline())
                .with_endpoint(endpoint.clone()),
        );
        fx.store(&fx.active_subscription(Timestamp::now())).await;

        let report = DataSynchronizationTask::new(synchronizer, false)
            .run(Timestamp::now())
            .await;

        assert_eq!(report, JobReport::empty());
        assert_eq!(endpoint.call_count(), 0);
        assert!(fx.watermark.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn enabled_task_syncs_and_advances_watermark() {
        let fx = Fixture::new().await;
        let endpoint = Arc::new(RecordingSyncEndpoint::new("analytics"));
        let synchronizer = Arc::new(
            DataSynchronizer::new(fx.repo.clone(), fx.watermark.clone(), 10, fx.deadline())
                .with_endpoint(endpoint.clone()),
        );
        let now = Timestamp::now();
        let sub = fx.active_subscription(now);
        fx.store(&sub).await;
        let run_at = now.add_days(1);

        let report = DataSynchronizationTask::new(synchronizer, true).run(run_at).await;

        assert_eq!(report.succeeded, 1);
        let watermark = fx.watermark.load().await.unwrap().unwrap();
        assert_eq!(
            watermark,
            run_at.minus(Duration::minutes(WATERMARK_OVERLAP_MINUTES))
        );
        assert!(watermark.is_after(&sub.updated_at));
        assert!(!watermark.is_after(&run_at));
    }
}
