//! Payment webhook verification port.
//!
//! Turns a raw, signed provider callback into a provider-neutral event.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp};

/// Payment callback after signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentWebhookEvent {
    PaymentFailed {
        external_subscription_id: String,
        invoice_id: Option<String>,
        reason: String,
    },
    PaymentSucceeded {
        external_subscription_id: String,
        invoice_id: Option<String>,
        /// Charge (or payment intent) that paid the invoice.
        charge_id: Option<String>,
    },
    /// Any other callback type; acknowledged and ignored.
    Other { event_type: String },
}

impl PaymentWebhookEvent {
    pub fn event_type(&self) -> &str {
        match self {
            PaymentWebhookEvent::PaymentFailed { .. } => "invoice.payment_failed",
            PaymentWebhookEvent::PaymentSucceeded { .. } => "invoice.payment_succeeded",
            PaymentWebhookEvent::Other { event_type } => event_type,
        }
    }
}

#[async_trait]
pub trait PaymentWebhookVerifier: Send + Sync {
    /// Verifies `signature` over `payload` and parses the event.
    ///
    /// # Errors
    ///
    /// `InvalidWebhook` for a bad signature, stale timestamp or malformed body.
    async fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        now: Timestamp,
    ) -> Result<PaymentWebhookEvent, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_webhook_verifier_is_object_safe() {
        fn _accepts_dyn(_verifier: &dyn PaymentWebhookVerifier) {}
    }

    #[test]
    fn other_keeps_provider_type() {
        let event = PaymentWebhookEvent::Other {
            event_type: "customer.created".to_string(),
        };
        assert_eq!(event.event_type(), "customer.created");
    }
}
