//! In-memory failed email, watermark and metrics stores.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::notification::FailedEmail;
use crate::domain::subscription::DailyMetrics;
use crate::ports::{FailedEmailRepository, MetricsStore, SyncWatermarkStore};

#[derive(Default)]
pub struct InMemoryFailedEmailRepository {
    records: RwLock<Vec<FailedEmail>>,
}

impl InMemoryFailedEmailRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<FailedEmail> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl FailedEmailRepository for InMemoryFailedEmailRepository {
    async fn save(&self, record: &FailedEmail) -> Result<(), DomainError> {
        self.records.write().await.push(record.clone());
        Ok(())
    }

    async fn find_created_before(
        &self,
        before: Timestamp,
    ) -> Result<Vec<FailedEmail>, DomainError> {
        let mut found: Vec<FailedEmail> = self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.created_at.is_before(&before))
            .cloned()
            .collect();
        found.sort_by_key(|r| r.created_at);
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryWatermarkStore {
    watermark: RwLock<Option<Timestamp>>,
}

impl InMemoryWatermarkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(watermark: Timestamp) -> Self {
        Self {
            watermark: RwLock::new(Some(watermark)),
        }
    }
}

#[async_trait]
impl SyncWatermarkStore for InMemoryWatermarkStore {
    async fn load(&self) -> Result<Option<Timestamp>, DomainError> {
        Ok(*self.watermark.read().await)
    }

    async fn store(&self, watermark: Timestamp) -> Result<(), DomainError> {
        *self.watermark.write().await = Some(watermark);
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMetricsStore {
    days: RwLock<BTreeMap<NaiveDate, DailyMetrics>>,
}

impl InMemoryMetricsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, day: NaiveDate) -> Option<DailyMetrics> {
        self.days.read().await.get(&day).cloned()
    }
}

#[async_trait]
impl MetricsStore for InMemoryMetricsStore {
    async fn record(&self, metrics: &DailyMetrics) -> Result<(), DomainError> {
        self.days.write().await.insert(metrics.day, metrics.clone());
        Ok(())
    }
}
