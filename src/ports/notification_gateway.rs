//! Notification gateway port - transport for email and push messages.
//!
//! The gateway makes a single delivery attempt. Retry policy belongs to the
//! caller.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for delivering user-facing messages.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Sends a plain-text email.
    ///
    /// # Errors
    ///
    /// - `NotificationError` when the provider rejects or cannot be reached
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError>;

    /// Sends a push notification to a device token.
    async fn send_push(&self, token: &str, title: &str, body: &str) -> Result<(), DomainError>;
}
