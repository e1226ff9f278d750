//! Notification gateway that only writes to the log.
//!
//! Default when no email provider key is configured.

use async_trait::async_trait;
use tracing::info;

use crate::domain::foundation::DomainError;
use crate::ports::NotificationGateway;

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationGateway;

impl LoggingNotificationGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl NotificationGateway for LoggingNotificationGateway {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        info!(to, subject, body_len = body.len(), "Email (log only)");
        Ok(())
    }

    async fn send_push(&self, token: &str, title: &str, _body: &str) -> Result<(), DomainError> {
        info!(token, title, "Push (log only)");
        Ok(())
    }
}
