//! Subscription lifecycle status and its transition table.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{StateMachine, ValidationError};

/// Status of a subscription in its lifecycle.
///
/// ```text
///  Pending ──► Trial ──► TrialEnded ──► Expired ──► Archived
///     │          │           │             ▲  ▲
///     ▼          ▼           ▼             │  │
///   Active ◄──► PaymentFailed ─────────────┘  │
///     │  ▲                                    │
///     ▼  │                                    │
///   Cancelled ────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Created but not yet confirmed by the payment provider.
    Pending,
    /// Free trial running until `trial_end_date`.
    Trial,
    /// Paid and entitled.
    Active,
    /// Last charge failed; awaiting recovery.
    PaymentFailed,
    /// Cancelled by the user; `cancelled_at` is set.
    Cancelled,
    /// End date passed without renewal.
    Expired,
    /// Trial ran out without conversion.
    TrialEnded,
    /// Retired after the cancellation retention window.
    Archived,
    /// Dormant; eligible for deletion after the inactivity window.
    Inactive,
}

impl SubscriptionStatus {
    /// All statuses, in declaration order.
    pub const ALL: [SubscriptionStatus; 9] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Trial,
        SubscriptionStatus::Active,
        SubscriptionStatus::PaymentFailed,
        SubscriptionStatus::Cancelled,
        SubscriptionStatus::Expired,
        SubscriptionStatus::TrialEnded,
        SubscriptionStatus::Archived,
        SubscriptionStatus::Inactive,
    ];

    /// Statuses the cleanup job treats as inactive for deletion.
    pub const DORMANT: [SubscriptionStatus; 3] = [
        SubscriptionStatus::Expired,
        SubscriptionStatus::Inactive,
        SubscriptionStatus::Archived,
    ];

    /// Storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PaymentFailed => "payment_failed",
            SubscriptionStatus::Cancelled => "cancelled",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::TrialEnded => "trial_ended",
            SubscriptionStatus::Archived => "archived",
            SubscriptionStatus::Inactive => "inactive",
        }
    }

    /// Parses the storage representation (case-insensitive).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        let lowered = value.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == lowered)
            .ok_or_else(|| {
                ValidationError::invalid_format("status", format!("unknown status '{}'", value))
            })
    }

    /// Returns true if the subscriber currently has access to content.
    pub fn grants_access(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Trial | SubscriptionStatus::Active | SubscriptionStatus::PaymentFailed
        )
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl StateMachine for SubscriptionStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, target),
            (Pending, Active)
                | (Pending, Trial)
                | (Pending, PaymentFailed)
                | (Pending, Cancelled)
                | (Trial, Active)
                | (Trial, TrialEnded)
                | (Trial, PaymentFailed)
                | (Trial, Cancelled)
                | (Active, PaymentFailed)
                | (Active, Cancelled)
                | (Active, Expired)
                | (Active, Inactive)
                | (PaymentFailed, Active)
                | (PaymentFailed, Cancelled)
                | (PaymentFailed, Expired)
                | (Cancelled, Active)
                | (Cancelled, Archived)
                | (Cancelled, Expired)
                | (TrialEnded, Active)
                | (TrialEnded, Expired)
                | (TrialEnded, Inactive)
                | (Expired, Active)
                | (Expired, Archived)
                | (Expired, Inactive)
                | (Inactive, Archived)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use SubscriptionStatus::*;
        match self {
            Pending => vec![Active, Trial, PaymentFailed, Cancelled],
            Trial => vec![Active, TrialEnded, PaymentFailed, Cancelled],
            Active => vec![PaymentFailed, Cancelled, Expired, Inactive],
            PaymentFailed => vec![Active, Cancelled, Expired],
            Cancelled => vec![Active, Archived, Expired],
            TrialEnded => vec![Active, Expired, Inactive],
            Expired => vec![Active, Archived, Inactive],
            Inactive => vec![Archived],
            Archived => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SubscriptionStatus::*;

    #[test]
    fn valid_transitions_match_can_transition_to() {
        for from in SubscriptionStatus::ALL {
            for to in SubscriptionStatus::ALL {
                assert_eq!(
                    from.can_transition_to(&to),
                    from.valid_transitions().contains(&to),
                    "{:?} -> {:?}",
                    from,
                    to
                );
            }
        }
    }

    #[test]
    fn archived_is_the_only_terminal_status() {
        let terminal: Vec<_> = SubscriptionStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(terminal, vec![Archived]);
    }

    #[test]
    fn cancelled_can_be_reactivated_or_archived() {
        assert!(Cancelled.can_transition_to(&Active));
        assert!(Cancelled.can_transition_to(&Archived));
        assert!(!Cancelled.can_transition_to(&Trial));
    }

    #[test]
    fn trial_cannot_expire_directly() {
        assert!(!Trial.can_transition_to(&Expired));
        assert!(Trial.can_transition_to(&TrialEnded));
    }

    #[test]
    fn no_self_transitions() {
        for status in SubscriptionStatus::ALL {
            assert!(!status.can_transition_to(&status), "{:?}", status);
        }
    }

    #[test]
    fn parse_accepts_storage_form_and_rejects_unknown() {
        for status in SubscriptionStatus::ALL {
            assert_eq!(SubscriptionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert_eq!(SubscriptionStatus::parse("PAYMENT_FAILED").unwrap(), PaymentFailed);
        assert!(SubscriptionStatus::parse("frozen").is_err());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&TrialEnded).unwrap(), "\"trial_ended\"");
    }

    #[test]
    fn access_is_granted_only_while_entitled() {
        assert!(Active.grants_access());
        assert!(Trial.grants_access());
        assert!(PaymentFailed.grants_access());
        assert!(!Cancelled.grants_access());
        assert!(!Expired.grants_access());
    }
}
