//! Subscription repository port.
//!
//! Besides aggregate persistence, exposes the time-window queries driven by
//! the reconciliation jobs. Every window query is paged with `PageRequest`
//! and ordered deterministically so offsets are stable between calls.
//!
//! # Example
//!
//! ```ignore
//! let mut page = PageRequest::first(100);
//! loop {
//!     let batch = repo.find_billing_on(day, page).await?;
//!     if batch.is_empty() {
//!         break;
//!     }
//!     // process...
//!     page = page.advance(batch.len());
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp};
use crate::domain::subscription::{Subscription, SubscriptionStatus};

/// Offset/limit window over an ordered query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: usize,
    pub limit: usize,
}

impl PageRequest {
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// Moves the window forward by `by` rows.
    pub fn advance(self, by: usize) -> Self {
        Self {
            offset: self.offset + by,
            limit: self.limit,
        }
    }
}

/// Repository port for Subscription aggregate persistence.
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Save a new subscription.
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Update an existing subscription, status and dates in one write.
    ///
    /// `updated_at` is stamped with the time of the write, not the value
    /// carried by the aggregate.
    ///
    /// # Errors
    ///
    /// - `SubscriptionNotFound` if the row does not exist
    /// - `DatabaseError` on persistence failure
    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError>;

    /// Physically delete a subscription.
    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError>;

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError>;

    /// Find by the payment provider's subscription ID.
    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Auto-renewing active or trial subscriptions with `next_renewal_date <= now`.
    async fn find_due_for_renewal(
        &self,
        now: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Non-expired subscriptions whose end date falls on `day`.
    async fn find_expiring_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Subscriptions with `end_date < before` and status other than Expired.
    async fn find_ended_before(
        &self,
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Trial subscriptions whose trial end date falls on `day`.
    async fn find_trial_ending_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Trial subscriptions with `trial_end_date < before`.
    async fn find_trial_ended_before(
        &self,
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Subscriptions whose next billing date falls on `day`.
    async fn find_billing_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Cancelled subscriptions with `cancelled_at < before`.
    async fn find_cancelled_before(
        &self,
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Subscriptions in one of `statuses` with `updated_at < before`.
    async fn find_inactive_before(
        &self,
        statuses: &[SubscriptionStatus],
        before: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Subscriptions with `updated_at > since`, oldest change first.
    async fn find_updated_since(
        &self,
        since: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Subscriptions with `from <= created_at < to`.
    async fn find_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError>;

    /// Count of subscriptions with `from <= cancelled_at < to`.
    async fn count_cancelled_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<i64, DomainError>;

    async fn count_by_status(&self, status: SubscriptionStatus) -> Result<i64, DomainError>;
}
