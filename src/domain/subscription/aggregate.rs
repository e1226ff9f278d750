//! Subscription aggregate entity.
//!
//! The Subscription aggregate is the single owner of lifecycle state. All
//! status changes go through the transition methods below so that status and
//! the dates that justify it always change together.
//!
//! # Design Decisions
//!
//! - **Explicit clock**: every mutating method takes `now` so batch jobs can
//!   evaluate a whole run against one instant
//! - **Money in cents**: prices live on the level as i64 cents
//! - **One promotion**: a second promotion is rejected, not replaced

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    PromotionId, StateMachine, SubscriptionId, SubscriptionLevelId, Timestamp, UserId,
};

use super::{SubscriptionError, SubscriptionStatus};

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub user_id: UserId,
    pub level_id: SubscriptionLevelId,
    pub initial_status: SubscriptionStatus,
    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub trial_end_date: Option<Timestamp>,
    pub auto_renew: bool,
    pub external_customer_id: Option<String>,
}

/// Subscription aggregate.
///
/// # Invariants
///
/// - `Cancelled` implies `cancelled_at` is set
/// - `Expired` implies `end_date` is in the past at transition time
/// - `Active` implies `end_date` is absent or in the future at transition time
/// - At most one promotion attached
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub level_id: SubscriptionLevelId,
    pub status: SubscriptionStatus,

    pub start_date: Timestamp,
    pub end_date: Option<Timestamp>,
    pub trial_end_date: Option<Timestamp>,
    pub next_billing_date: Option<Timestamp>,
    pub next_renewal_date: Option<Timestamp>,
    pub auto_renew: bool,
    pub cancelled_at: Option<Timestamp>,

    /// Payment provider subscription reference (`sub_...`).
    pub external_subscription_id: Option<String>,
    /// Payment provider customer reference (`cus_...`).
    pub external_customer_id: Option<String>,
    /// Charge used for refunds on early cancellation.
    pub external_charge_id: Option<String>,
    pub last_payment_error: Option<String>,
    pub promotion_id: Option<PromotionId>,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a subscription in `Trial` or `Active` status.
    ///
    /// # Errors
    ///
    /// - `start_date` before today
    /// - `end_date` before `start_date`
    /// - initial status other than Trial/Active
    /// - Trial without a trial end date
    pub fn create(input: NewSubscription, now: Timestamp) -> Result<Self, SubscriptionError> {
        if input.start_date.date() < now.date() {
            return Err(SubscriptionError::validation(
                "start_date",
                "start date cannot be in the past",
            ));
        }
        if let Some(end) = input.end_date {
            if end.is_before(&input.start_date) {
                return Err(SubscriptionError::validation(
                    "end_date",
                    "end date cannot be before start date",
                ));
            }
        }
        match input.initial_status {
            SubscriptionStatus::Active => {}
            SubscriptionStatus::Trial => {
                if input.trial_end_date.is_none() {
                    return Err(SubscriptionError::validation(
                        "trial_end_date",
                        "trial subscriptions need a trial end date",
                    ));
                }
            }
            other => {
                return Err(SubscriptionError::validation(
                    "status",
                    format!("initial status must be trial or active, got {}", other),
                ))
            }
        }

        Ok(Self {
            id: SubscriptionId::new(),
            user_id: input.user_id,
            level_id: input.level_id,
            status: input.initial_status,
            start_date: input.start_date,
            end_date: input.end_date,
            trial_end_date: input.trial_end_date,
            next_billing_date: None,
            next_renewal_date: None,
            auto_renew: input.auto_renew,
            cancelled_at: None,
            external_subscription_id: None,
            external_customer_id: input.external_customer_id,
            external_charge_id: None,
            last_payment_error: None,
            promotion_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true if the subscription started less than `days` days before `now`.
    pub fn started_within_days(&self, days: i64, now: Timestamp) -> bool {
        self.start_date.is_after(&now.minus_days(days))
    }

    /// Returns true if the end date falls on `day` and the subscription is not yet expired.
    pub fn is_expiring_on(&self, day: chrono::NaiveDate) -> bool {
        self.status != SubscriptionStatus::Expired
            && self.end_date.map(|end| end.date() == day).unwrap_or(false)
    }

    /// Trial → TrialEnded once the trial end date has passed.
    pub fn end_trial(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        match self.trial_end_date {
            Some(trial_end) if trial_end.is_before(&now) => {
                self.transition_to(SubscriptionStatus::TrialEnded, "end trial", now)
            }
            _ => Err(SubscriptionError::validation(
                "trial_end_date",
                "trial end date has not passed",
            )),
        }
    }

    /// Active/Trial/Pending → PaymentFailed.
    pub fn mark_payment_failed(
        &mut self,
        reason: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), SubscriptionError> {
        self.transition_to(SubscriptionStatus::PaymentFailed, "fail payment for", now)?;
        self.last_payment_error = Some(reason.into());
        Ok(())
    }

    /// PaymentFailed → Active with the period extended to `new_end_date`.
    pub fn recover_payment(
        &mut self,
        new_end_date: Timestamp,
        now: Timestamp,
    ) -> Result<(), SubscriptionError> {
        if self.status != SubscriptionStatus::PaymentFailed {
            return Err(SubscriptionError::invalid_state(self.status, "recover payment for"));
        }
        self.transition_to(SubscriptionStatus::Active, "recover payment for", now)?;
        self.end_date = Some(new_end_date);
        self.last_payment_error = None;
        Ok(())
    }

    /// → Cancelled, stamping `cancelled_at`.
    pub fn cancel(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        self.transition_to(SubscriptionStatus::Cancelled, "cancel", now)?;
        self.cancelled_at = Some(now);
        Ok(())
    }

    /// Cancelled → Active with a fresh next billing date.
    ///
    /// A lapsed end date is moved to the new billing date so the Active
    /// invariant holds.
    pub fn reactivate(
        &mut self,
        next_billing_date: Timestamp,
        now: Timestamp,
    ) -> Result<(), SubscriptionError> {
        if self.status != SubscriptionStatus::Cancelled {
            return Err(SubscriptionError::invalid_state(self.status, "reactivate"));
        }
        self.transition_to(SubscriptionStatus::Active, "reactivate", now)?;
        self.cancelled_at = None;
        self.next_billing_date = Some(next_billing_date);
        if self.end_date.map(|end| !end.is_after(&now)).unwrap_or(false) {
            self.end_date = Some(next_billing_date);
        }
        Ok(())
    }

    /// → Expired once the end date has passed.
    pub fn expire(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        match self.end_date {
            Some(end) if end.is_before(&now) => {
                self.transition_to(SubscriptionStatus::Expired, "expire", now)
            }
            _ => Err(SubscriptionError::validation(
                "end_date",
                "end date has not passed",
            )),
        }
    }

    /// Cancelled/Expired/Inactive → Archived.
    pub fn archive(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        self.transition_to(SubscriptionStatus::Archived, "archive", now)
    }

    /// Replaces the plan. Returns the previous level, or `None` when unchanged.
    pub fn change_level(
        &mut self,
        level_id: SubscriptionLevelId,
        now: Timestamp,
    ) -> Option<SubscriptionLevelId> {
        if self.level_id == level_id {
            return None;
        }
        let previous = std::mem::replace(&mut self.level_id, level_id);
        self.updated_at = now;
        Some(previous)
    }

    /// Attaches a promotion; a subscription carries at most one.
    pub fn attach_promotion(
        &mut self,
        promotion_id: PromotionId,
        now: Timestamp,
    ) -> Result<(), SubscriptionError> {
        if self.promotion_id.is_some() {
            return Err(SubscriptionError::validation(
                "promotion",
                "a promotion is already applied to this subscription",
            ));
        }
        self.promotion_id = Some(promotion_id);
        self.updated_at = now;
        Ok(())
    }

    /// Records the payment provider references for a new billing arrangement.
    pub fn link_external(
        &mut self,
        external_subscription_id: impl Into<String>,
        next_billing_date: Option<Timestamp>,
        now: Timestamp,
    ) {
        self.external_subscription_id = Some(external_subscription_id.into());
        self.next_billing_date = next_billing_date;
        self.updated_at = now;
    }

    /// Remembers the latest provider charge, refunded on early cancellation.
    pub fn record_charge(&mut self, charge_ref: impl Into<String>, now: Timestamp) {
        self.external_charge_id = Some(charge_ref.into());
        self.updated_at = now;
    }

    /// Returns true if the renewal job may charge this subscription.
    pub fn is_renewable(&self) -> bool {
        self.auto_renew
            && matches!(
                self.status,
                SubscriptionStatus::Active | SubscriptionStatus::Trial
            )
    }

    /// Records a successful automatic renewal.
    ///
    /// Advances `next_renewal_date` by one month from its previous value
    /// (or from `now` when unset). Missed periods collapse into one: the new
    /// renewal date is never at or before `now`.
    pub fn record_renewal(
        &mut self,
        external_subscription_id: impl Into<String>,
        next_billing_date: Option<Timestamp>,
        now: Timestamp,
    ) {
        let anchor = self.next_renewal_date.unwrap_or(now);
        let mut next_renewal = anchor.add_months(1);
        if !next_renewal.is_after(&now) {
            next_renewal = now.add_months(1);
        }
        self.external_subscription_id = Some(external_subscription_id.into());
        self.next_renewal_date = Some(next_renewal);
        if next_billing_date.is_some() {
            self.next_billing_date = next_billing_date;
        }
        self.updated_at = now;
    }

    fn transition_to(
        &mut self,
        target: SubscriptionStatus,
        action: &str,
        now: Timestamp,
    ) -> Result<(), SubscriptionError> {
        self.status = self
            .status
            .transition_to(target)
            .map_err(|_| SubscriptionError::invalid_state(self.status, action))?;
        self.updated_at = now;
        Ok(())
    }
}
