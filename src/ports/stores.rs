//! Small persistence ports: failed emails, the sync watermark and metrics.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::FailedEmail;
use crate::domain::subscription::DailyMetrics;

/// Durable record of undeliverable notifications.
#[async_trait]
pub trait FailedEmailRepository: Send + Sync {
    async fn save(&self, record: &FailedEmail) -> Result<(), DomainError>;

    /// Records created before `before`, oldest first.
    async fn find_created_before(&self, before: Timestamp)
        -> Result<Vec<FailedEmail>, DomainError>;
}

/// Process-wide last successful sync timestamp.
#[async_trait]
pub trait SyncWatermarkStore: Send + Sync {
    /// Returns `None` if no sync has ever completed.
    async fn load(&self) -> Result<Option<Timestamp>, DomainError>;

    async fn store(&self, watermark: Timestamp) -> Result<(), DomainError>;
}

/// Daily metric sink.
#[async_trait]
pub trait MetricsStore: Send + Sync {
    /// Records all metrics of one day, replacing earlier values for that day.
    async fn record(&self, metrics: &DailyMetrics) -> Result<(), DomainError>;
}
