//! Notification kinds and their rendered text.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

/// A rendered message ready for a gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedMessage {
    pub subject: String,
    pub body: String,
}

/// Lifecycle notifications sent to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    Welcome {
        level_name: String,
    },
    Expiring {
        level_name: String,
        end_date: Timestamp,
    },
    Expired {
        level_name: String,
    },
    TrialEnding {
        trial_end_date: Timestamp,
    },
    TrialEnded,
    PaymentFailed {
        level_name: String,
        reason: String,
    },
    PaymentSucceeded {
        level_name: String,
        next_end_date: Timestamp,
    },
    RenewalReminder {
        level_name: String,
        billing_date: Timestamp,
        days_before: i64,
    },
    LevelChanged {
        previous_level_name: String,
        new_level_name: String,
    },
    CancellationConfirmation {
        level_name: String,
        refunded: bool,
    },
}

impl NotificationKind {
    /// Short label used in logs and failure records.
    pub fn label(&self) -> &'static str {
        match self {
            NotificationKind::Welcome { .. } => "welcome",
            NotificationKind::Expiring { .. } => "expiring",
            NotificationKind::Expired { .. } => "expired",
            NotificationKind::TrialEnding { .. } => "trial_ending",
            NotificationKind::TrialEnded => "trial_ended",
            NotificationKind::PaymentFailed { .. } => "payment_failed",
            NotificationKind::PaymentSucceeded { .. } => "payment_succeeded",
            NotificationKind::RenewalReminder { .. } => "renewal_reminder",
            NotificationKind::LevelChanged { .. } => "level_changed",
            NotificationKind::CancellationConfirmation { .. } => "cancellation_confirmation",
        }
    }

    /// Renders subject and plain-text body for `recipient_name`.
    pub fn render(&self, recipient_name: &str) -> RenderedMessage {
        let greeting = format!("Hello {},", recipient_name);
        let (subject, text) = match self {
            NotificationKind::Welcome { level_name } => (
                "Welcome to Videoflix!".to_string(),
                format!(
                    "Your {} subscription is ready. Enjoy unlimited streaming.",
                    level_name
                ),
            ),
            NotificationKind::Expiring { level_name, end_date } => (
                format!("Your {} subscription expires soon", level_name),
                format!(
                    "Your {} subscription ends on {}. Renew it to keep watching.",
                    level_name,
                    end_date.date()
                ),
            ),
            NotificationKind::Expired { level_name } => (
                format!("Your {} subscription has expired", level_name),
                "Your subscription has expired. Reactivate it at any time to resume watching."
                    .to_string(),
            ),
            NotificationKind::TrialEnding { trial_end_date } => (
                "Your free trial ends soon".to_string(),
                format!(
                    "Your free trial ends on {}. Choose a plan to keep watching.",
                    trial_end_date.date()
                ),
            ),
            NotificationKind::TrialEnded => (
                "Your free trial has ended".to_string(),
                "Your free trial has ended. Subscribe to continue watching.".to_string(),
            ),
            NotificationKind::PaymentFailed { level_name, reason } => (
                format!("Payment failed for your {} subscription", level_name),
                format!(
                    "We could not process your payment ({}). Please update your payment method.",
                    reason
                ),
            ),
            NotificationKind::PaymentSucceeded {
                level_name,
                next_end_date,
            } => (
                format!("Payment received for your {} subscription", level_name),
                format!(
                    "Thank you. Your subscription now runs until {}.",
                    next_end_date.date()
                ),
            ),
            NotificationKind::RenewalReminder {
                level_name,
                billing_date,
                days_before,
            } => (
                format!(
                    "Your {} subscription renews in {} days",
                    level_name, days_before
                ),
                format!(
                    "Your next payment is scheduled for {}.",
                    billing_date.date()
                ),
            ),
            NotificationKind::LevelChanged {
                previous_level_name,
                new_level_name,
            } => (
                format!("Your subscription is now {}", new_level_name),
                format!(
                    "Your plan changed from {} to {}.",
                    previous_level_name, new_level_name
                ),
            ),
            NotificationKind::CancellationConfirmation {
                level_name,
                refunded,
            } => (
                format!("Your {} subscription was cancelled", level_name),
                if *refunded {
                    "Your subscription was cancelled and your last payment refunded.".to_string()
                } else {
                    "Your subscription was cancelled. We hope to see you again.".to_string()
                },
            ),
        };

        RenderedMessage {
            subject,
            body: format!("{}\n\n{}\n\nThe Videoflix team", greeting, text),
        }
    }
}

/// Body of a FailedEmail record for an undelivered welcome message.
pub fn welcome_failure_body(
    display_name: &str,
    user_id: &UserId,
    subscription_id: &SubscriptionId,
    reason: &str,
) -> String {
    format!(
        "Welcome email for {} could not be delivered.\nUser ID: {}\nSubscription ID: {}\nFailure reason: {}",
        display_name, user_id, subscription_id, reason
    )
}

/// Alert sent to operators when a notification exhausts its attempts.
pub fn delivery_failure_alert(
    email_type: &str,
    recipient: &str,
    subject: &str,
    error: &str,
) -> RenderedMessage {
    RenderedMessage {
        subject: format!("[ALERT] Email delivery failed: {}", subject),
        body: format!(
            "Email type: {}\nRecipient: {}\nError: {}",
            email_type, recipient, error
        ),
    }
}
