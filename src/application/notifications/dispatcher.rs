//! NotificationDispatcher - delivers lifecycle notifications.
//!
//! Two delivery policies:
//!
//! | Policy | Used for | On failure |
//! |--------|----------|------------|
//! | Fire-and-log | every lifecycle notice | logged, never returned |
//! | Retry + escalate | welcome email | FailedEmail record + operator alert |
//!
//! A missing recipient address is never an error: delivery is skipped with
//! a warning.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::application::CallDeadline;
use crate::domain::foundation::{ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::notification::{
    delivery_failure_alert, welcome_failure_body, FailedEmail, NotificationKind, RenderedMessage,
};
use crate::ports::{
    FailedEmailRepository, NotificationGateway, OperationsAlerter, UserContact, UserDirectory,
};

/// Attempts made for the welcome email before escalating.
pub const MAX_RETRIES: u32 = 3;

/// Result of a fire-and-log delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    /// No recipient address (or no such user).
    Skipped,
    /// Delivery failed; the error has been logged.
    Failed(String),
}

/// Result of the welcome email path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WelcomeOutcome {
    Delivered { attempts: u32 },
    Escalated { attempts: u32, reason: String },
    Skipped,
}

/// Sends notifications through the gateway.
pub struct NotificationDispatcher {
    gateway: Arc<dyn NotificationGateway>,
    users: Arc<dyn UserDirectory>,
    failed_emails: Arc<dyn FailedEmailRepository>,
    alerter: Arc<dyn OperationsAlerter>,
    deadline: CallDeadline,
}

impl NotificationDispatcher {
    pub fn new(
        gateway: Arc<dyn NotificationGateway>,
        users: Arc<dyn UserDirectory>,
        failed_emails: Arc<dyn FailedEmailRepository>,
        alerter: Arc<dyn OperationsAlerter>,
        deadline: CallDeadline,
    ) -> Self {
        Self {
            gateway,
            users,
            failed_emails,
            alerter,
            deadline,
        }
    }

    /// Looks up the subscriber and sends `kind` once.
    pub async fn notify_user(&self, user_id: &UserId, kind: &NotificationKind) -> DispatchOutcome {
        match self.lookup(user_id).await {
            Some(contact) => self.notify(&contact, kind).await,
            None => DispatchOutcome::Skipped,
        }
    }

    /// Sends `kind` once to `contact`. Failures are logged, never returned.
    pub async fn notify(&self, contact: &UserContact, kind: &NotificationKind) -> DispatchOutcome {
        let Some(email) = recipient(contact) else {
            warn!(
                user_id = %contact.id,
                notification = kind.label(),
                "No recipient address, notification skipped"
            );
            return DispatchOutcome::Skipped;
        };

        let message = kind.render(&contact.display_name);
        self.push(contact, &message).await;

        match self.send_once(email, &message).await {
            Ok(()) => {
                debug!(user_id = %contact.id, notification = kind.label(), "Notification sent");
                DispatchOutcome::Sent
            }
            Err(reason) => {
                warn!(
                    user_id = %contact.id,
                    notification = kind.label(),
                    error = %reason,
                    "Notification delivery failed"
                );
                DispatchOutcome::Failed(reason)
            }
        }
    }

    /// Sends the welcome email with up to [`MAX_RETRIES`] attempts.
    ///
    /// On exhaustion a FailedEmail is stored and operators are alerted. The
    /// two recovery actions run independently of each other.
    pub async fn send_welcome(
        &self,
        user_id: &UserId,
        subscription_id: &SubscriptionId,
        level_name: &str,
        now: Timestamp,
    ) -> WelcomeOutcome {
        let Some(contact) = self.lookup(user_id).await else {
            return WelcomeOutcome::Skipped;
        };
        let Some(email) = recipient(&contact) else {
            warn!(user_id = %user_id, "No recipient address, welcome email skipped");
            return WelcomeOutcome::Skipped;
        };

        let kind = NotificationKind::Welcome {
            level_name: level_name.to_string(),
        };
        let message = kind.render(&contact.display_name);
        self.push(&contact, &message).await;

        let mut last_error = String::new();
        for attempt in 1..=MAX_RETRIES {
            match self.send_once(email, &message).await {
                Ok(()) => {
                    info!(
                        user_id = %user_id,
                        subscription_id = %subscription_id,
                        attempts = attempt,
                        "Welcome email delivered"
                    );
                    return WelcomeOutcome::Delivered { attempts: attempt };
                }
                Err(reason) => {
                    warn!(
                        user_id = %user_id,
                        attempt,
                        max_attempts = MAX_RETRIES,
                        error = %reason,
                        "Welcome email attempt failed"
                    );
                    last_error = reason;
                }
            }
        }

        self.escalate(&contact, email, subscription_id, &message, &last_error, now)
            .await;

        WelcomeOutcome::Escalated {
            attempts: MAX_RETRIES,
            reason: last_error,
        }
    }

    async fn escalate(
        &self,
        contact: &UserContact,
        email: &str,
        subscription_id: &SubscriptionId,
        message: &RenderedMessage,
        reason: &str,
        now: Timestamp,
    ) {
        // 1. Durable record for operator follow-up
        let body = welcome_failure_body(&contact.display_name, &contact.id, subscription_id, reason);
        let subject = format!("{} (delivery failed)", message.subject);
        match FailedEmail::new(email, subject, body, MAX_RETRIES, reason, now) {
            Ok(record) => {
                if let Err(e) = self.failed_emails.save(&record).await {
                    error!(
                        user_id = %contact.id,
                        error = %e,
                        "Failed to persist failed welcome email"
                    );
                }
            }
            Err(e) => error!(user_id = %contact.id, error = %e, "Invalid failed email record"),
        }

        // 2. Operator alert, regardless of the outcome above
        let alert = delivery_failure_alert("welcome", email, &message.subject, reason);
        let sent = self
            .deadline
            .outbound(
                ErrorCode::NotificationError,
                self.alerter.alert(&alert.subject, &alert.body),
            )
            .await;
        if let Err(e) = sent {
            error!(user_id = %contact.id, error = %e, "Failed to alert operators");
        }

        error!(
            user_id = %contact.id,
            subscription_id = %subscription_id,
            error = %reason,
            "Welcome email escalated after {} attempts",
            MAX_RETRIES
        );
    }

    async fn send_once(&self, email: &str, message: &RenderedMessage) -> Result<(), String> {
        self.deadline
            .outbound(
                ErrorCode::NotificationError,
                self.gateway.send_email(email, &message.subject, &message.body),
            )
            .await
            .map_err(|e| e.message)
    }

    async fn push(&self, contact: &UserContact, message: &RenderedMessage) {
        let Some(token) = contact.push_token.as_deref().filter(|t| !t.is_empty()) else {
            return;
        };
        let sent = self
            .deadline
            .outbound(
                ErrorCode::NotificationError,
                self.gateway.send_push(token, &message.subject, &message.body),
            )
            .await;
        if let Err(e) = sent {
            warn!(user_id = %contact.id, error = %e, "Push notification failed");
        }
    }

    async fn lookup(&self, user_id: &UserId) -> Option<UserContact> {
        match self.users.find_by_id(user_id).await {
            Ok(Some(contact)) => Some(contact),
            Ok(None) => {
                warn!(user_id = %user_id, "User not found, notification skipped");
                None
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User lookup failed, notification skipped");
                None
            }
        }
    }
}

fn recipient(contact: &UserContact) -> Option<&str> {
    contact
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
}
