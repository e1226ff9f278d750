//! Operations alerter that emails every configured admin address.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{NotificationGateway, OperationsAlerter};

pub struct EmailOperationsAlerter {
    gateway: Arc<dyn NotificationGateway>,
    admin_emails: Vec<String>,
}

impl EmailOperationsAlerter {
    pub fn new(gateway: Arc<dyn NotificationGateway>, admin_emails: Vec<String>) -> Self {
        let admin_emails = admin_emails
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty())
            .collect();
        Self {
            gateway,
            admin_emails,
        }
    }
}

#[async_trait]
impl OperationsAlerter for EmailOperationsAlerter {
    /// Succeeds if at least one admin received the alert.
    async fn alert(&self, subject: &str, body: &str) -> Result<(), DomainError> {
        if self.admin_emails.is_empty() {
            warn!(subject, "No admin emails configured, alert not sent");
            return Ok(());
        }

        let mut delivered = 0usize;
        for admin in &self.admin_emails {
            match self.gateway.send_email(admin, subject, body).await {
                Ok(()) => delivered += 1,
                Err(e) => error!(admin = %admin, error = %e, "Failed to deliver operations alert"),
            }
        }

        if delivered == 0 {
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("alert reached none of {} admins", self.admin_emails.len()),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notification::RecordingNotificationGateway;

    #[tokio::test]
    async fn alerts_every_admin() {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let alerter = EmailOperationsAlerter::new(
            gateway.clone(),
            vec!["ops@x.io".to_string(), "cto@x.io".to_string()],
        );

        alerter.alert("[ALERT] x", "body").await.unwrap();

        let recipients: Vec<_> = gateway.delivered().into_iter().map(|e| e.to).collect();
        assert_eq!(recipients, vec!["ops@x.io", "cto@x.io"]);
    }

    #[tokio::test]
    async fn no_admins_is_not_an_error() {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        let alerter = EmailOperationsAlerter::new(gateway.clone(), vec![" ".to_string()]);

        alerter.alert("s", "b").await.unwrap();

        assert!(gateway.attempts().is_empty());
    }

    #[tokio::test]
    async fn one_admin_failing_still_succeeds() {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        gateway.fail_recipient("ops@x.io");
        let alerter = EmailOperationsAlerter::new(
            gateway.clone(),
            vec!["ops@x.io".to_string(), "cto@x.io".to_string()],
        );

        assert!(alerter.alert("s", "b").await.is_ok());
    }

    #[tokio::test]
    async fn all_admins_failing_is_an_error() {
        let gateway = Arc::new(RecordingNotificationGateway::new());
        gateway.fail_recipient("ops@x.io");
        let alerter = EmailOperationsAlerter::new(gateway, vec!["ops@x.io".to_string()]);

        assert!(alerter.alert("s", "b").await.is_err());
    }
}
