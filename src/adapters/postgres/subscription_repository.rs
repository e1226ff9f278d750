//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Window queries are ordered by the column they filter on, then by id, so
//! offset paging is stable between calls.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, PromotionId, SubscriptionId, SubscriptionLevelId, Timestamp, UserId,
};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::{PageRequest, SubscriptionRepository};

const COLUMNS: &str = "id, user_id, level_id, status, start_date, end_date, trial_end_date, \
    next_billing_date, next_renewal_date, auto_renew, cancelled_at, external_subscription_id, \
    external_customer_id, external_charge_id, last_payment_error, promotion_id, created_at, updated_at";

pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Runs a window query whose predicate references `$1..=$n` for `bounds`.
    async fn fetch_window(
        &self,
        predicate: &str,
        order_by: &str,
        bounds: &[Timestamp],
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE {} ORDER BY {}, id LIMIT ${} OFFSET ${}",
            COLUMNS,
            predicate,
            order_by,
            bounds.len() + 1,
            bounds.len() + 2
        );
        let mut query = sqlx::query_as::<_, SubscriptionRow>(&sql);
        for bound in bounds {
            query = query.bind(*bound.as_datetime());
        }
        let rows = query
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to query subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    level_id: Uuid,
    status: String,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    trial_end_date: Option<DateTime<Utc>>,
    next_billing_date: Option<DateTime<Utc>>,
    next_renewal_date: Option<DateTime<Utc>>,
    auto_renew: bool,
    cancelled_at: Option<DateTime<Utc>>,
    external_subscription_id: Option<String>,
    external_customer_id: Option<String>,
    external_charge_id: Option<String>,
    last_payment_error: Option<String>,
    promotion_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let status = SubscriptionStatus::parse(&row.status).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid status value: {}", e))
        })?;
        let user_id = UserId::new(row.user_id).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid user_id: {}", e))
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id,
            level_id: SubscriptionLevelId::from_uuid(row.level_id),
            status,
            start_date: Timestamp::from_datetime(row.start_date),
            end_date: row.end_date.map(Timestamp::from_datetime),
            trial_end_date: row.trial_end_date.map(Timestamp::from_datetime),
            next_billing_date: row.next_billing_date.map(Timestamp::from_datetime),
            next_renewal_date: row.next_renewal_date.map(Timestamp::from_datetime),
            auto_renew: row.auto_renew,
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            external_subscription_id: row.external_subscription_id,
            external_customer_id: row.external_customer_id,
            external_charge_id: row.external_charge_id,
            last_payment_error: row.last_payment_error,
            promotion_id: row.promotion_id.map(PromotionId::from_uuid),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

pub(super) fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("{}: {}", context, e))
}

fn day_bounds(day: NaiveDate) -> (Timestamp, Timestamp) {
    let start = Timestamp::from_date(day);
    (start, start.add_days(1))
}

fn opt_dt(ts: Option<Timestamp>) -> Option<DateTime<Utc>> {
    ts.map(|t| *t.as_datetime())
}

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, level_id, status, start_date, end_date, trial_end_date,
                next_billing_date, next_renewal_date, auto_renew, cancelled_at,
                external_subscription_id, external_customer_id, external_charge_id,
                last_payment_error, promotion_id, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_str())
        .bind(subscription.level_id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.start_date.as_datetime())
        .bind(opt_dt(subscription.end_date))
        .bind(opt_dt(subscription.trial_end_date))
        .bind(opt_dt(subscription.next_billing_date))
        .bind(opt_dt(subscription.next_renewal_date))
        .bind(subscription.auto_renew)
        .bind(opt_dt(subscription.cancelled_at))
        .bind(&subscription.external_subscription_id)
        .bind(&subscription.external_customer_id)
        .bind(&subscription.external_charge_id)
        .bind(&subscription.last_payment_error)
        .bind(subscription.promotion_id.map(|p| *p.as_uuid()))
        .bind(subscription.created_at.as_datetime())
        .bind(subscription.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save subscription", e))?;

        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions SET
                level_id = $2,
                status = $3,
                end_date = $4,
                trial_end_date = $5,
                next_billing_date = $6,
                next_renewal_date = $7,
                auto_renew = $8,
                cancelled_at = $9,
                external_subscription_id = $10,
                external_customer_id = $11,
                external_charge_id = $12,
                last_payment_error = $13,
                promotion_id = $14,
                updated_at = clock_timestamp()
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.level_id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(opt_dt(subscription.end_date))
        .bind(opt_dt(subscription.trial_end_date))
        .bind(opt_dt(subscription.next_billing_date))
        .bind(opt_dt(subscription.next_renewal_date))
        .bind(subscription.auto_renew)
        .bind(opt_dt(subscription.cancelled_at))
        .bind(&subscription.external_subscription_id)
        .bind(&subscription.external_customer_id)
        .bind(&subscription.external_charge_id)
        .bind(&subscription.last_payment_error)
        .bind(subscription.promotion_id.map(|p| *p.as_uuid()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                subscription.id.to_string(),
            ));
        }
        Ok(())
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM subscriptions WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("Failed to delete subscription", e))?;
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        let sql = format!("SELECT {} FROM subscriptions WHERE id = $1", COLUMNS);
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE external_subscription_id = $1",
            COLUMNS
        );
        let row: Option<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(external_subscription_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn find_due_for_renewal(
        &self,
        now: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_window(
            "auto_renew AND status IN ('active', 'trial') AND next_renewal_date <= $1",
            "next_renewal_date",
            &[now],
            page,
        )
        .await
    }

    async fn find_expiring_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        let (start, end) = day_bounds(day);
        self.fetch_window(
            "status <> 'expired' AND end_date >= $1 AND end_date < $2",
            "end_date",
            &[start, end],
            page,
        )
        .await
    }

    async fn find_ended_before(
        &self,
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_window(
            "status <> 'expired' AND end_date < $1",
            "end_date",
            &[before],
            page,
        )
        .await
    }

    async fn find_trial_ending_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        let (start, end) = day_bounds(day);
        self.fetch_window(
            "status = 'trial' AND trial_end_date >= $1 AND trial_end_date < $2",
            "trial_end_date",
            &[start, end],
            page,
        )
        .await
    }

    async fn find_trial_ended_before(
        &self,
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_window(
            "status = 'trial' AND trial_end_date < $1",
            "trial_end_date",
            &[before],
            page,
        )
        .await
    }

    async fn find_billing_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        let (start, end) = day_bounds(day);
        self.fetch_window(
            "next_billing_date >= $1 AND next_billing_date < $2",
            "next_billing_date",
            &[start, end],
            page,
        )
        .await
    }

    async fn find_cancelled_before(
        &self,
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_window(
            "status = 'cancelled' AND cancelled_at < $1",
            "cancelled_at",
            &[before],
            page,
        )
        .await
    }

    async fn find_inactive_before(
        &self,
        statuses: &[SubscriptionStatus],
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        let statuses: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
        let sql = format!(
            "SELECT {} FROM subscriptions WHERE status = ANY($1) AND updated_at < $2 \
             ORDER BY updated_at, id LIMIT $3 OFFSET $4",
            COLUMNS
        );
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&sql)
            .bind(&statuses)
            .bind(before.as_datetime())
            .bind(page.limit as i64)
            .bind(page.offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("Failed to query inactive subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn find_updated_since(
        &self,
        since: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_window(
            "updated_at > $1",
            "updated_at",
            &[since],
            page,
        )
        .await
    }

    async fn find_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        self.fetch_window(
            "created_at >= $1 AND created_at < $2",
            "created_at",
            &[from, to],
            page,
        )
        .await
    }

    async fn count_cancelled_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<i64, DomainError> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM subscriptions WHERE cancelled_at >= $1 AND cancelled_at < $2",
        )
        .bind(from.as_datetime())
        .bind(to.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("Failed to count cancellations", e))
    }

    async fn count_by_status(&self, status: SubscriptionStatus) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM subscriptions WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("Failed to count subscriptions", e))
    }
}
