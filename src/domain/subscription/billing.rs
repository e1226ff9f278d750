//! Billing date arithmetic.
//!
//! Pure functions over a subscription and its plan. Month arithmetic is
//! calendar-correct and clamps to the last day of shorter months.

use tracing::warn;

use crate::domain::foundation::Timestamp;

use super::{BillingFrequency, Subscription, SubscriptionLevel};

/// Result of the reactivation calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactivationDate {
    /// Derived from the cancellation date and the plan frequency.
    Computed(Timestamp),
    /// `now + 1 month` because the cancellation date or plan was missing.
    /// Treat as a heuristic, not an authoritative billing figure.
    Fallback(Timestamp),
}

impl ReactivationDate {
    pub fn date(&self) -> Timestamp {
        match self {
            ReactivationDate::Computed(ts) | ReactivationDate::Fallback(ts) => *ts,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, ReactivationDate::Fallback(_))
    }
}

/// Computes next billing and reactivation dates.
pub struct BillingCalculator;

impl BillingCalculator {
    /// Advances `anchor` by one billing period of `frequency`.
    pub fn advance(anchor: Timestamp, frequency: BillingFrequency) -> Timestamp {
        anchor.add_months(frequency.months())
    }

    /// Next billing date, anchored on the current next billing date or the start date.
    ///
    /// Returns `None` when the plan or its frequency is unknown; callers must
    /// not schedule a charge in that case.
    pub fn next_billing_date(
        subscription: &Subscription,
        level: Option<&SubscriptionLevel>,
    ) -> Option<Timestamp> {
        let Some(frequency) = level.and_then(|l| l.billing_frequency) else {
            warn!(
                subscription_id = %subscription.id,
                "Undetermined billing frequency, next billing date not computed"
            );
            return None;
        };
        let anchor = subscription
            .next_billing_date
            .unwrap_or(subscription.start_date);
        Some(Self::advance(anchor, frequency))
    }

    /// Next billing date for a reactivated subscription, anchored on `cancelled_at`.
    ///
    /// Never fails: missing data yields `now + 1 month` wrapped in
    /// [`ReactivationDate::Fallback`].
    pub fn next_billing_date_after_reactivation(
        subscription: &Subscription,
        level: Option<&SubscriptionLevel>,
        now: Timestamp,
    ) -> ReactivationDate {
        let frequency = level.and_then(|l| l.billing_frequency);
        match (subscription.cancelled_at, frequency) {
            (Some(cancelled_at), Some(frequency)) => {
                ReactivationDate::Computed(Self::advance(cancelled_at, frequency))
            }
            _ => {
                warn!(
                    subscription_id = %subscription.id,
                    has_cancelled_at = subscription.cancelled_at.is_some(),
                    has_frequency = frequency.is_some(),
                    "Reactivation billing date fell back to now + 1 month"
                );
                ReactivationDate::Fallback(now.add_months(1))
            }
        }
    }

    /// New end date after a recovered payment: one period past the later of
    /// the current end date and `now`, falling back to one month.
    pub fn extended_end_date(
        subscription: &Subscription,
        level: Option<&SubscriptionLevel>,
        now: Timestamp,
    ) -> Timestamp {
        let anchor = match subscription.end_date {
            Some(end) if end.is_after(&now) => end,
            _ => now,
        };
        let months = level
            .and_then(|l| l.billing_frequency)
            .map(|f| f.months())
            .unwrap_or(1);
        anchor.add_months(months)
    }
}
