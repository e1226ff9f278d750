//! PostgreSQL adapters - sqlx implementations of the persistence ports.
//!
//! - `PostgresSubscriptionRepository` - Subscriptions and the scheduler's window queries
//! - `PostgresLevelRepository`, `PostgresPromotionRepository`, `PostgresUserDirectory` - Reference data
//! - `PostgresFailedEmailRepository`, `PostgresWatermarkStore`, `PostgresMetricsStore` - Job bookkeeping
//!
//! Schema lives in `migrations/`.

mod reference_data;
mod stores;
mod subscription_repository;

pub use reference_data::{PostgresLevelRepository, PostgresPromotionRepository, PostgresUserDirectory};
pub use stores::{PostgresFailedEmailRepository, PostgresMetricsStore, PostgresWatermarkStore};
pub use subscription_repository::PostgresSubscriptionRepository;
