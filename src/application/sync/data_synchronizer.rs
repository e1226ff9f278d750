//! DataSynchronizer - pushes subscription snapshots to CRM/analytics.
//!
//! Each endpoint is independent: one failing endpoint never blocks another.
//! The watermark moves only when a whole window reached every endpoint, so a
//! partial failure retries the same window on the next run.
//!
//! The stored watermark trails the run start by [`WATERMARK_OVERLAP_MINUTES`], so a
//! row stamped just before the run but committed after the read is picked up
//! again next time. Endpoints receive upserts, so re-sending is harmless.

use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::application::CallDeadline;
use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::subscription::Subscription;
use crate::ports::{
    CancellationPayload, CancellationSink, PageRequest, SubscriptionRepository,
    SubscriptionSnapshot, SyncEndpoint, SyncWatermarkStore,
};

/// How far behind the run start the next window begins.
pub const WATERMARK_OVERLAP_MINUTES: i64 = 5;

/// Result of pushing one batch to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointOutcome {
    pub endpoint: String,
    pub error: Option<String>,
}

impl EndpointOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a watermark-driven sync run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub pages: usize,
    pub synced: usize,
    pub endpoint_failures: usize,
    pub watermark_advanced: bool,
}

pub struct DataSynchronizer {
    repository: Arc<dyn SubscriptionRepository>,
    watermark: Arc<dyn SyncWatermarkStore>,
    endpoints: Vec<Arc<dyn SyncEndpoint>>,
    cancellation_sink: Option<Arc<dyn CancellationSink>>,
    batch_size: usize,
    deadline: CallDeadline,
}

impl DataSynchronizer {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        watermark: Arc<dyn SyncWatermarkStore>,
        batch_size: usize,
        deadline: CallDeadline,
    ) -> Self {
        Self {
            repository,
            watermark,
            endpoints: Vec::new(),
            cancellation_sink: None,
            batch_size: batch_size.max(1),
            deadline,
        }
    }

    /// Registers a snapshot endpoint (CRM, analytics).
    pub fn with_endpoint(mut self, endpoint: Arc<dyn SyncEndpoint>) -> Self {
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_cancellation_sink(mut self, sink: Arc<dyn CancellationSink>) -> Self {
        self.cancellation_sink = Some(sink);
        self
    }

    pub fn has_endpoints(&self) -> bool {
        !self.endpoints.is_empty()
    }

    /// Pushes `batch` to every configured endpoint.
    ///
    /// Failures are logged per endpoint and reported in the outcome list.
    pub async fn synchronize_subscriptions(&self, batch: &[Subscription]) -> Vec<EndpointOutcome> {
        if batch.is_empty() || self.endpoints.is_empty() {
            return Vec::new();
        }

        let snapshots: Vec<SubscriptionSnapshot> =
            batch.iter().map(SubscriptionSnapshot::from).collect();
        let snapshots = snapshots.as_slice();

        let pushes = self.endpoints.iter().map(|endpoint| async move {
            let result = self
                .deadline
                .outbound(ErrorCode::SyncEndpointError, endpoint.push(snapshots))
                .await;
            match result {
                Ok(()) => {
                    info!(
                        endpoint = endpoint.name(),
                        count = snapshots.len(),
                        "Subscriptions synchronized"
                    );
                    EndpointOutcome {
                        endpoint: endpoint.name().to_string(),
                        error: None,
                    }
                }
                Err(e) => {
                    error!(
                        endpoint = endpoint.name(),
                        count = snapshots.len(),
                        error = %e,
                        "Subscription sync failed"
                    );
                    EndpointOutcome {
                        endpoint: endpoint.name().to_string(),
                        error: Some(e.message),
                    }
                }
            }
        });

        join_all(pushes).await
    }

    /// Syncs everything updated since the stored watermark.
    ///
    /// # Errors
    ///
    /// Only storage failures (watermark or subscription reads) are returned.
    /// Endpoint failures leave the watermark in place and are reported.
    pub async fn synchronize_since_watermark(
        &self,
        now: Timestamp,
    ) -> Result<SyncReport, DomainError> {
        let mut report = SyncReport::default();

        if self.endpoints.is_empty() {
            warn!("No sync endpoints configured, watermark not advanced");
            return Ok(report);
        }

        // 1. Window start (epoch when never synced)
        let since = self
            .watermark
            .load()
            .await?
            .unwrap_or_else(Timestamp::epoch);

        // 2. Page through the window
        let mut page = PageRequest::first(self.batch_size);
        loop {
            let batch = self.repository.find_updated_since(since, page).await?;
            if batch.is_empty() {
                break;
            }

            let outcomes = self.synchronize_subscriptions(&batch).await;
            report.pages += 1;
            report.synced += batch.len();
            report.endpoint_failures += outcomes.iter().filter(|o| !o.succeeded()).count();

            page = page.advance(batch.len());
        }

        // 3. Advance only on a clean window
        if report.endpoint_failures == 0 {
            let next = now.minus(Duration::minutes(WATERMARK_OVERLAP_MINUTES)).max(since);
            self.watermark.store(next).await?;
            report.watermark_advanced = true;
        } else {
            warn!(
                failures = report.endpoint_failures,
                since = %since,
                "Sync window incomplete, watermark kept"
            );
        }

        info!(
            pages = report.pages,
            synced = report.synced,
            watermark_advanced = report.watermark_advanced,
            "Data synchronization finished"
        );

        Ok(report)
    }

    /// Posts a cancellation record to the cancellation feed, if configured.
    ///
    /// Failures are logged and swallowed.
    pub async fn notify_cancellation_event(
        &self,
        external_subscription_id: &str,
        cancelled_at: Timestamp,
    ) {
        let Some(sink) = &self.cancellation_sink else {
            warn!(
                external_subscription_id,
                "No cancellation endpoint configured, event not sent"
            );
            return;
        };

        let payload = CancellationPayload {
            external_subscription_id: external_subscription_id.to_string(),
            cancellation_date: cancelled_at,
        };
        let result = self
            .deadline
            .outbound(ErrorCode::SyncEndpointError, sink.notify(&payload))
            .await;
        if let Err(e) = result {
            error!(
                external_subscription_id,
                error = %e,
                "Failed to send cancellation event"
            );
        }
    }
}
