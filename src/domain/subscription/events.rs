//! Subscription domain events.
//!
//! Published after the corresponding state change has been persisted:
//! - `SubscriptionCreated` - New subscription purchased
//! - `SubscriptionCancelled` - User cancelled
//! - `SubscriptionReactivated` - Cancelled subscription brought back
//! - `SubscriptionLevelChanged` - Plan replaced
//! - `SubscriptionPaymentFailed` / `SubscriptionPaymentRecovered` - Payment callbacks
//! - `SubscriptionRenewed` - Automatic renewal charged
//! - `SubscriptionExpired` / `SubscriptionTrialEnded` - Batch transitions

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    domain_event, EventId, SubscriptionId, SubscriptionLevelId, Timestamp, UserId,
};

use super::SubscriptionStatus;

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionCreated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a subscription is purchased.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCreated {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub level_id: SubscriptionLevelId,
    /// Trial or Active.
    pub status: SubscriptionStatus,
    pub next_billing_date: Option<Timestamp>,
    pub created_at: Timestamp,
}

domain_event!(
    SubscriptionCreated,
    event_type = "subscription.created.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = created_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionCancelled
// ════════════════════════════════════════════════════════════════════════════

/// Published when a subscription is cancelled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionCancelled {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub reason: String,
    /// Refund id when the cancellation fell inside the refund window.
    pub refund_id: Option<String>,
    pub cancelled_at: Timestamp,
}

domain_event!(
    SubscriptionCancelled,
    event_type = "subscription.cancelled.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = cancelled_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionReactivated
// ════════════════════════════════════════════════════════════════════════════

/// Published when a cancelled subscription becomes active again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionReactivated {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub next_billing_date: Timestamp,
    /// True when the billing date is the `now + 1 month` heuristic.
    pub billing_date_estimated: bool,
    pub reactivated_at: Timestamp,
}

domain_event!(
    SubscriptionReactivated,
    event_type = "subscription.reactivated.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = reactivated_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// SubscriptionLevelChanged
// ════════════════════════════════════════════════════════════════════════════

/// Published when the plan of a subscription is replaced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionLevelChanged {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub previous_level_id: SubscriptionLevelId,
    /// Display name of the previous level, empty if it no longer exists.
    pub previous_level_name: String,
    pub new_level_id: SubscriptionLevelId,
    pub new_level_name: String,
    pub changed_at: Timestamp,
}

domain_event!(
    SubscriptionLevelChanged,
    event_type = "subscription.level_changed.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = changed_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// Payment callbacks
// ════════════════════════════════════════════════════════════════════════════

/// Published when the payment provider reports a failed invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPaymentFailed {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub invoice_id: Option<String>,
    pub reason: String,
    pub failed_at: Timestamp,
}

domain_event!(
    SubscriptionPaymentFailed,
    event_type = "subscription.payment_failed.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = failed_at,
    event_id = event_id
);

/// Published when a failed subscription is paid again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPaymentRecovered {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub new_end_date: Timestamp,
    pub recovered_at: Timestamp,
}

domain_event!(
    SubscriptionPaymentRecovered,
    event_type = "subscription.payment_recovered.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = recovered_at,
    event_id = event_id
);

// ════════════════════════════════════════════════════════════════════════════
// Batch transitions
// ════════════════════════════════════════════════════════════════════════════

/// Published when the renewal job charges a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionRenewed {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub external_subscription_id: String,
    pub next_renewal_date: Option<Timestamp>,
    pub renewed_at: Timestamp,
}

domain_event!(
    SubscriptionRenewed,
    event_type = "subscription.renewed.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = renewed_at,
    event_id = event_id
);

/// Published when the expiration job expires a subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionExpired {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub previous_status: SubscriptionStatus,
    pub expired_at: Timestamp,
}

domain_event!(
    SubscriptionExpired,
    event_type = "subscription.expired.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = expired_at,
    event_id = event_id
);

/// Published when a trial runs out without conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionTrialEnded {
    pub event_id: EventId,
    pub subscription_id: SubscriptionId,
    pub user_id: UserId,
    pub ended_at: Timestamp,
}

domain_event!(
    SubscriptionTrialEnded,
    event_type = "subscription.trial_ended.v1",
    aggregate_id = subscription_id,
    aggregate_type = "Subscription",
    occurred_at = ended_at,
    event_id = event_id
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainEvent, SerializableDomainEvent};

    #[test]
    fn cancelled_event_envelope_carries_version() {
        let event = SubscriptionCancelled {
            event_id: EventId::new(),
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new("user-1").unwrap(),
            reason: "too expensive".to_string(),
            refund_id: None,
            cancelled_at: Timestamp::now(),
        };

        let envelope = event.to_envelope().unwrap();
        assert_eq!(envelope.event_type, "subscription.cancelled.v1");
        assert_eq!(envelope.schema_version, 1);
        assert_eq!(envelope.aggregate_type, "Subscription");
        assert_eq!(envelope.aggregate_id, event.subscription_id.to_string());
        assert_eq!(envelope.payload["reason"], "too expensive");
    }

    #[test]
    fn level_changed_reports_previous_name() {
        let event = SubscriptionLevelChanged {
            event_id: EventId::new(),
            subscription_id: SubscriptionId::new(),
            user_id: UserId::new("user-1").unwrap(),
            previous_level_id: SubscriptionLevelId::new(),
            previous_level_name: "Basic".to_string(),
            new_level_id: SubscriptionLevelId::new(),
            new_level_name: "Premium".to_string(),
            changed_at: Timestamp::now(),
        };
        assert_eq!(event.event_type(), "subscription.level_changed.v1");
        let envelope = event.to_envelope().unwrap();
        let decoded: SubscriptionLevelChanged = envelope.payload_as().unwrap();
        assert_eq!(decoded.previous_level_name, "Basic");
    }
}
