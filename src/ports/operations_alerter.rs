//! Operations alerter port - escalation channel to administrators.

use async_trait::async_trait;

use crate::domain::foundation::DomainError;

/// Port for alerting operators about failures that need manual follow-up.
#[async_trait]
pub trait OperationsAlerter: Send + Sync {
    async fn alert(&self, subject: &str, body: &str) -> Result<(), DomainError>;
}
