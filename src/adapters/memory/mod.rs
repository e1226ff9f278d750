//! In-memory adapters for persistence ports.
//!
//! Used by tests and for running the service without a database.

mod reference_data;
mod stores;
mod subscription_repository;

pub use reference_data::{InMemoryLevelRepository, InMemoryPromotionRepository, InMemoryUserDirectory};
pub use stores::{InMemoryFailedEmailRepository, InMemoryMetricsStore, InMemoryWatermarkStore};
pub use subscription_repository::InMemorySubscriptionRepository;
