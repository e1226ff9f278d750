//! PostgreSQL readers for plans, promotions and user contacts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, PromotionId, SubscriptionLevelId, Timestamp, UserId,
};
use crate::domain::subscription::{BillingFrequency, LevelTier, Promotion, SubscriptionLevel};
use crate::ports::{PromotionRepository, SubscriptionLevelRepository, UserContact, UserDirectory};

use super::subscription_repository::db_error;

pub struct PostgresLevelRepository {
    pool: PgPool,
}

impl PostgresLevelRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LevelRow {
    id: Uuid,
    tier: String,
    price_cents: i64,
    currency: String,
    billing_frequency: Option<String>,
    external_price_id: String,
}

impl TryFrom<LevelRow> for SubscriptionLevel {
    type Error = DomainError;

    fn try_from(row: LevelRow) -> Result<Self, Self::Error> {
        let tier = LevelTier::parse(&row.tier).map_err(|e| {
            DomainError::new(ErrorCode::DatabaseError, format!("Invalid tier value: {}", e))
        })?;
        Ok(SubscriptionLevel {
            id: SubscriptionLevelId::from_uuid(row.id),
            tier,
            price_cents: row.price_cents,
            currency: row.currency.to_ascii_lowercase(),
            // Unknown legacy values leave the frequency undetermined.
            billing_frequency: row.billing_frequency.as_deref().and_then(BillingFrequency::parse),
            external_price_id: row.external_price_id,
        })
    }
}

#[async_trait]
impl SubscriptionLevelRepository for PostgresLevelRepository {
    async fn find_by_id(
        &self,
        id: &SubscriptionLevelId,
    ) -> Result<Option<SubscriptionLevel>, DomainError> {
        let row: Option<LevelRow> = sqlx::query_as(
            r#"
            SELECT id, tier, price_cents, currency, billing_frequency, external_price_id
            FROM subscription_levels
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription level", e))?;

        row.map(SubscriptionLevel::try_from).transpose()
    }
}

pub struct PostgresPromotionRepository {
    pool: PgPool,
}

impl PostgresPromotionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const PROMOTION_COLUMNS: &str =
    "id, code, description, discount_percentage, valid_from, valid_until, active";

#[derive(Debug, sqlx::FromRow)]
struct PromotionRow {
    id: Uuid,
    code: String,
    description: Option<String>,
    discount_percentage: i16,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    active: bool,
}

impl TryFrom<PromotionRow> for Promotion {
    type Error = DomainError;

    fn try_from(row: PromotionRow) -> Result<Self, Self::Error> {
        let discount_percentage = u8::try_from(row.discount_percentage).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid discount percentage: {}", row.discount_percentage),
            )
        })?;
        Ok(Promotion {
            id: PromotionId::from_uuid(row.id),
            code: row.code,
            description: row.description,
            discount_percentage,
            valid_from: Timestamp::from_datetime(row.valid_from),
            valid_until: Timestamp::from_datetime(row.valid_until),
            active: row.active,
        })
    }
}

#[async_trait]
impl PromotionRepository for PostgresPromotionRepository {
    async fn find_by_id(&self, id: &PromotionId) -> Result<Option<Promotion>, DomainError> {
        let sql = format!("SELECT {} FROM promotions WHERE id = $1", PROMOTION_COLUMNS);
        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find promotion", e))?;

        row.map(Promotion::try_from).transpose()
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Promotion>, DomainError> {
        let sql = format!("SELECT {} FROM promotions WHERE code = $1", PROMOTION_COLUMNS);
        let row: Option<PromotionRow> = sqlx::query_as(&sql)
            .bind(code.trim().to_uppercase())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("Failed to find promotion", e))?;

        row.map(Promotion::try_from).transpose()
    }
}

/// Reads contact details from the user service's table.
pub struct PostgresUserDirectory {
    pool: PgPool,
}

impl PostgresUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: Option<String>,
    display_name: String,
    push_token: Option<String>,
}

#[async_trait]
impl UserDirectory for PostgresUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<UserContact>, DomainError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, email, display_name, push_token FROM users WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find user", e))?;

        row.map(|row| {
            let id = UserId::new(row.id).map_err(|e| {
                DomainError::new(ErrorCode::DatabaseError, format!("Invalid user id: {}", e))
            })?;
            Ok(UserContact {
                id,
                email: row.email,
                display_name: row.display_name,
                push_token: row.push_token,
            })
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_row_with_unknown_frequency_loads() {
        let row = LevelRow {
            id: Uuid::new_v4(),
            tier: "PREMIUM".to_string(),
            price_cents: 999,
            currency: "USD".to_string(),
            billing_frequency: Some("weekly".to_string()),
            external_price_id: "price_premium".to_string(),
        };

        let level = SubscriptionLevel::try_from(row).unwrap();

        assert_eq!(level.tier, LevelTier::Premium);
        assert_eq!(level.currency, "usd");
        assert!(level.billing_frequency.is_none());
    }

    #[test]
    fn level_row_with_unknown_tier_fails() {
        let row = LevelRow {
            id: Uuid::new_v4(),
            tier: "platinum".to_string(),
            price_cents: 999,
            currency: "usd".to_string(),
            billing_frequency: None,
            external_price_id: "price_x".to_string(),
        };
        assert!(SubscriptionLevel::try_from(row).is_err());
    }

    #[test]
    fn promotion_row_rejects_out_of_range_discount() {
        let now = Utc::now();
        let row = PromotionRow {
            id: Uuid::new_v4(),
            code: "SPRING".to_string(),
            description: None,
            discount_percentage: 300,
            valid_from: now,
            valid_until: now,
            active: true,
        };
        assert!(Promotion::try_from(row).is_err());
    }
}
