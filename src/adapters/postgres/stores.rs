//! PostgreSQL failed email, sync watermark and metrics stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{DomainError, FailedEmailId, Timestamp};
use crate::domain::notification::FailedEmail;
use crate::domain::subscription::DailyMetrics;
use crate::ports::{FailedEmailRepository, MetricsStore, SyncWatermarkStore};

use super::subscription_repository::db_error;

pub struct PostgresFailedEmailRepository {
    pool: PgPool,
}

impl PostgresFailedEmailRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct FailedEmailRow {
    id: Uuid,
    recipient: String,
    subject: String,
    body: String,
    attempt_count: i32,
    failure_reason: String,
    created_at: DateTime<Utc>,
}

impl From<FailedEmailRow> for FailedEmail {
    fn from(row: FailedEmailRow) -> Self {
        FailedEmail {
            id: FailedEmailId::from_uuid(row.id),
            recipient: row.recipient,
            subject: row.subject,
            body: row.body,
            attempt_count: u32::try_from(row.attempt_count).unwrap_or(0),
            failure_reason: row.failure_reason,
            created_at: Timestamp::from_datetime(row.created_at),
        }
    }
}

#[async_trait]
impl FailedEmailRepository for PostgresFailedEmailRepository {
    async fn save(&self, record: &FailedEmail) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO failed_emails (id, recipient, subject, body, attempt_count, failure_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.recipient)
        .bind(&record.subject)
        .bind(&record.body)
        .bind(i32::try_from(record.attempt_count).unwrap_or(i32::MAX))
        .bind(&record.failure_reason)
        .bind(record.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save failed email", e))?;
        Ok(())
    }

    async fn find_created_before(
        &self,
        before: Timestamp,
    ) -> Result<Vec<FailedEmail>, DomainError> {
        let rows: Vec<FailedEmailRow> = sqlx::query_as(
            r#"
            SELECT id, recipient, subject, body, attempt_count, failure_reason, created_at
            FROM failed_emails
            WHERE created_at < $1
            ORDER BY created_at
            "#,
        )
        .bind(before.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to query failed emails", e))?;

        Ok(rows.into_iter().map(FailedEmail::from).collect())
    }
}

/// Single-row watermark table keyed by a constant id.
pub struct PostgresWatermarkStore {
    pool: PgPool,
}

impl PostgresWatermarkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SyncWatermarkStore for PostgresWatermarkStore {
    async fn load(&self) -> Result<Option<Timestamp>, DomainError> {
        let value: Option<DateTime<Utc>> =
            sqlx::query_scalar("SELECT last_synced_at FROM sync_watermark WHERE id = 1")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("Failed to load sync watermark", e))?;
        Ok(value.map(Timestamp::from_datetime))
    }

    async fn store(&self, watermark: Timestamp) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO sync_watermark (id, last_synced_at) VALUES (1, $1)
            ON CONFLICT (id) DO UPDATE SET last_synced_at = EXCLUDED.last_synced_at
            "#,
        )
        .bind(watermark.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to store sync watermark", e))?;
        Ok(())
    }
}

/// Stores one row per metric name and day.
pub struct PostgresMetricsStore {
    pool: PgPool,
}

impl PostgresMetricsStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MetricsStore for PostgresMetricsStore {
    async fn record(&self, metrics: &DailyMetrics) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin metrics transaction", e))?;

        for (name, value) in metrics.entries() {
            sqlx::query(
                r#"
                INSERT INTO subscription_metrics (metric_date, metric_name, metric_value)
                VALUES ($1, $2, $3)
                ON CONFLICT (metric_date, metric_name) DO UPDATE SET metric_value = EXCLUDED.metric_value
                "#,
            )
            .bind(metrics.day)
            .bind(name)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to record metric", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit metrics", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_email_row_converts() {
        let row = FailedEmailRow {
            id: Uuid::new_v4(),
            recipient: "user@example.com".to_string(),
            subject: "Welcome".to_string(),
            body: "Hi".to_string(),
            attempt_count: 3,
            failure_reason: "smtp down".to_string(),
            created_at: Utc::now(),
        };

        let record = FailedEmail::from(row);

        assert_eq!(record.attempt_count, 3);
        assert_eq!(record.failure_reason, "smtp down");
    }
}
