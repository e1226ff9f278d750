//! Access control publisher port.
//!
//! Downstream authorization systems revoke or restore entitlements when a
//! subscription is cancelled or reactivated.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};

/// Entitlement change signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessSignal {
    pub user_id: UserId,
    pub subscription_id: SubscriptionId,
    /// Display name of the plan, empty when unknown.
    pub level: String,
    pub reason: String,
    pub occurred_at: Timestamp,
}

/// Port for notifying access control of entitlement changes.
#[async_trait]
pub trait AccessControlPublisher: Send + Sync {
    async fn subscription_cancelled(&self, signal: AccessSignal) -> Result<(), DomainError>;

    async fn subscription_reactivated(&self, signal: AccessSignal) -> Result<(), DomainError>;
}
