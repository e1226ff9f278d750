//! In-memory subscription repository.
//!
//! Mirrors the ordering and filtering of the Postgres adapter so scheduler
//! behaviour can be exercised without a database.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp};
use crate::domain::subscription::{Subscription, SubscriptionStatus};
use crate::ports::{PageRequest, SubscriptionRepository};

/// Subscription storage backed by a `HashMap`.
#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    rows: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Rows whose `update` fails with a database error.
    failing_updates: RwLock<HashSet<SubscriptionId>>,
    fail_all_updates: RwLock<bool>,
    fail_all_saves: RwLock<bool>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a repository pre-filled with `subscriptions`.
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let rows = subscriptions.into_iter().map(|s| (s.id, s)).collect();
        Self {
            rows: RwLock::new(rows),
            ..Self::default()
        }
    }

    /// Makes `update` fail for one subscription.
    pub async fn fail_updates_for(&self, id: SubscriptionId) {
        self.failing_updates.write().await.insert(id);
    }

    /// Makes every `update` fail.
    pub async fn fail_updates(&self, failing: bool) {
        *self.fail_all_updates.write().await = failing;
    }

    /// Makes every `save` fail.
    pub async fn fail_saves(&self, failing: bool) {
        *self.fail_all_saves.write().await = failing;
    }

    /// Snapshot of all stored subscriptions.
    pub async fn all(&self) -> Vec<Subscription> {
        self.rows.read().await.values().cloned().collect()
    }

    async fn select<K, F>(&self, filter: F, sort_key: K, page: PageRequest) -> Vec<Subscription>
    where
        F: Fn(&Subscription) -> bool,
        K: Fn(&Subscription) -> Option<Timestamp>,
    {
        let rows = self.rows.read().await;
        let mut matches: Vec<&Subscription> = rows.values().filter(|s| filter(s)).collect();
        matches.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)).then(a.id.cmp(&b.id)));
        matches
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .cloned()
            .collect()
    }
}

fn on_day(ts: Option<Timestamp>, day: NaiveDate) -> bool {
    ts.map(|t| t.date() == day).unwrap_or(false)
}

fn before(ts: Option<Timestamp>, bound: Timestamp) -> bool {
    ts.map(|t| t.is_before(&bound)).unwrap_or(false)
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, subscription: &Subscription) -> Result<(), DomainError> {
        if *self.fail_all_saves.read().await {
            return Err(DomainError::database(format!(
                "simulated insert failure for {}",
                subscription.id
            )));
        }
        let mut rows = self.rows.write().await;
        if rows.contains_key(&subscription.id) {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Subscription {} already exists", subscription.id),
            ));
        }
        rows.insert(subscription.id, subscription.clone());
        Ok(())
    }

    async fn update(&self, subscription: &Subscription) -> Result<(), DomainError> {
        if *self.fail_all_updates.read().await
            || self.failing_updates.read().await.contains(&subscription.id)
        {
            return Err(DomainError::database(format!(
                "simulated write failure for {}",
                subscription.id
            )));
        }
        let mut rows = self.rows.write().await;
        match rows.get_mut(&subscription.id) {
            Some(row) => {
                *row = subscription.clone();
                row.updated_at = Timestamp::now();
                Ok(())
            }
            None => Err(DomainError::new(
                ErrorCode::SubscriptionNotFound,
                subscription.id.to_string(),
            )),
        }
    }

    async fn delete(&self, id: &SubscriptionId) -> Result<(), DomainError> {
        self.rows.write().await.remove(id);
        Ok(())
    }

    async fn find_by_id(&self, id: &SubscriptionId) -> Result<Option<Subscription>, DomainError> {
        Ok(self.rows.read().await.get(id).cloned())
    }

    async fn find_by_external_id(
        &self,
        external_subscription_id: &str,
    ) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .rows
            .read()
            .await
            .values()
            .find(|s| s.external_subscription_id.as_deref() == Some(external_subscription_id))
            .cloned())
    }

    async fn find_due_for_renewal(
        &self,
        now: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.is_renewable() && s.next_renewal_date.map(|d| !d.is_after(&now)).unwrap_or(false),
                |s| s.next_renewal_date,
                page,
            )
            .await)
    }

    async fn find_expiring_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.status != SubscriptionStatus::Expired && on_day(s.end_date, day),
                |s| s.end_date,
                page,
            )
            .await)
    }

    async fn find_ended_before(
        &self,
        bound: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.status != SubscriptionStatus::Expired && before(s.end_date, bound),
                |s| s.end_date,
                page,
            )
            .await)
    }

    async fn find_trial_ending_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.status == SubscriptionStatus::Trial && on_day(s.trial_end_date, day),
                |s| s.trial_end_date,
                page,
            )
            .await)
    }

    async fn find_trial_ended_before(
        &self,
        bound: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.status == SubscriptionStatus::Trial && before(s.trial_end_date, bound),
                |s| s.trial_end_date,
                page,
            )
            .await)
    }

    async fn find_billing_on(
        &self,
        day: NaiveDate,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| on_day(s.next_billing_date, day),
                |s| s.next_billing_date,
                page,
            )
            .await)
    }

    async fn find_cancelled_before(
        &self,
        bound: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.status == SubscriptionStatus::Cancelled && before(s.cancelled_at, bound),
                |s| s.cancelled_at,
                page,
            )
            .await)
    }

    async fn find_inactive_before(
        &self,
        statuses: &[SubscriptionStatus],
        bound: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| statuses.contains(&s.status) && s.updated_at.is_before(&bound),
                |s| Some(s.updated_at),
                page,
            )
            .await)
    }

    async fn find_updated_since(
        &self,
        since: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| s.updated_at.is_after(&since),
                |s| Some(s.updated_at),
                page,
            )
            .await)
    }

    async fn find_created_between(
        &self,
        from: Timestamp,
        to: Timestamp,
        page: PageRequest,
    ) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .select(
                |s| !s.created_at.is_before(&from) && s.created_at.is_before(&to),
                |s| Some(s.created_at),
                page,
            )
            .await)
    }

    async fn count_cancelled_between(
        &self,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<i64, DomainError> {
        let rows = self.rows.read().await;
        let count = rows
            .values()
            .filter(|s| {
                s.cancelled_at
                    .map(|c| !c.is_before(&from) && c.is_before(&to))
                    .unwrap_or(false)
            })
            .count();
        Ok(count as i64)
    }

    async fn count_by_status(&self, status: SubscriptionStatus) -> Result<i64, DomainError> {
        let rows = self.rows.read().await;
        Ok(rows.values().filter(|s| s.status == status).count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{SubscriptionLevelId, UserId};
    use crate::domain::subscription::NewSubscription;

    fn subscription(now: Timestamp) -> Subscription {
        Subscription::create(
            NewSubscription {
                user_id: UserId::new("user-1").unwrap(),
                level_id: SubscriptionLevelId::new(),
                initial_status: SubscriptionStatus::Active,
                start_date: now,
                end_date: Some(now.add_days(30)),
                trial_end_date: None,
                auto_renew: true,
                external_customer_id: None,
            },
            now,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn save_rejects_duplicates_and_update_requires_row() {
        let now = Timestamp::now();
        let repo = InMemorySubscriptionRepository::new();
        let sub = subscription(now);

        assert!(repo.update(&sub).await.is_err());
        repo.save(&sub).await.unwrap();
        assert!(repo.save(&sub).await.is_err());
        assert_eq!(repo.find_by_id(&sub.id).await.unwrap(), Some(sub));
    }

    #[tokio::test]
    async fn ended_before_excludes_expired_and_future() {
        let now = Timestamp::now();
        let mut past = subscription(now);
        past.end_date = Some(now.minus_days(2));
        let mut expired = subscription(now);
        expired.end_date = Some(now.minus_days(2));
        expired.status = SubscriptionStatus::Expired;
        let future = subscription(now);

        let repo =
            InMemorySubscriptionRepository::with_subscriptions(vec![past.clone(), expired, future]);
        let found = repo
            .find_ended_before(now.start_of_day(), PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(found, vec![past]);
    }

    #[tokio::test]
    async fn paging_is_stable() {
        let now = Timestamp::now();
        let subs: Vec<_> = (0..5)
            .map(|i| {
                let mut s = subscription(now);
                s.next_billing_date = Some(now.add_days(3));
                s.updated_at = now.add_days(i);
                s
            })
            .collect();
        let repo = InMemorySubscriptionRepository::with_subscriptions(subs);
        let day = now.add_days(3).date();

        let first = repo.find_billing_on(day, PageRequest::first(2)).await.unwrap();
        let second = repo
            .find_billing_on(day, PageRequest::first(2).advance(2))
            .await
            .unwrap();
        let third = repo
            .find_billing_on(day, PageRequest::first(2).advance(4))
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), 1);
        assert!(first.iter().all(|s| !second.contains(s)));
    }

    #[tokio::test]
    async fn counts_cancellations_in_window() {
        let now = Timestamp::now();
        let mut cancelled = subscription(now);
        cancelled.cancel(now).unwrap();
        let repo = InMemorySubscriptionRepository::with_subscriptions(vec![
            cancelled,
            subscription(now),
        ]);
        let count = repo
            .count_cancelled_between(now.minus_days(1), now.add_days(1))
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(repo.count_by_status(SubscriptionStatus::Active).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn update_stamps_write_time() {
        let job_start = Timestamp::now().minus_days(1);
        let mut sub = subscription(job_start);
        let repo = InMemorySubscriptionRepository::with_subscriptions(vec![sub.clone()]);
        let before_write = Timestamp::now();

        sub.auto_renew = false;
        sub.updated_at = job_start;
        repo.update(&sub).await.unwrap();

        let stored = repo.find_by_id(&sub.id).await.unwrap().unwrap();
        assert!(!stored.auto_renew);
        assert!(!stored.updated_at.is_before(&before_write));
    }

    #[tokio::test]
    async fn due_for_renewal_skips_cancelled_rows() {
        let now = Timestamp::now();
        let mut live = subscription(now);
        live.next_renewal_date = Some(now.minus_days(1));
        let mut cancelled = live.clone();
        cancelled.id = SubscriptionId::new();
        cancelled.status = SubscriptionStatus::Cancelled;
        let repo =
            InMemorySubscriptionRepository::with_subscriptions(vec![live.clone(), cancelled]);

        let due = repo
            .find_due_for_renewal(now, PageRequest::first(10))
            .await
            .unwrap();

        assert_eq!(due, vec![live]);
    }
}
