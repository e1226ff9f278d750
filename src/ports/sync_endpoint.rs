//! Outbound mirroring ports for CRM and analytics systems.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::subscription::Subscription;

/// Flat view of a subscription sent to external systems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSnapshot {
    pub id: String,
    pub user_id: String,
    pub level_id: String,
    pub status: String,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub next_billing_date: Option<Timestamp>,
    pub auto_renew: bool,
    pub cancelled_at: Option<Timestamp>,
    pub external_subscription_id: Option<String>,
    pub updated_at: Timestamp,
}

impl From<&Subscription> for SubscriptionSnapshot {
    fn from(sub: &Subscription) -> Self {
        Self {
            id: sub.id.to_string(),
            user_id: sub.user_id.to_string(),
            level_id: sub.level_id.to_string(),
            status: sub.status.as_str().to_string(),
            start_date: sub.start_date,
            end_date: sub.end_date,
            next_billing_date: sub.next_billing_date,
            auto_renew: sub.auto_renew,
            cancelled_at: sub.cancelled_at,
            external_subscription_id: sub.external_subscription_id.clone(),
            updated_at: sub.updated_at,
        }
    }
}

/// Cancellation analytics payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancellationPayload {
    pub external_subscription_id: String,
    pub cancellation_date: Timestamp,
}

/// A bulk mirror target (CRM, analytics).
#[async_trait]
pub trait SyncEndpoint: Send + Sync {
    /// Name used in logs and outcomes.
    fn name(&self) -> &str;

    async fn push(&self, batch: &[SubscriptionSnapshot]) -> Result<(), DomainError>;
}

/// Single-purpose cancellation analytics target.
#[async_trait]
pub trait CancellationSink: Send + Sync {
    async fn notify(&self, payload: &CancellationPayload) -> Result<(), DomainError>;
}
