//! Stripe webhook verification.
//!
//! Checks the `Stripe-Signature` HMAC-SHA256 over `"{t}.{payload}"` with a
//! constant-time comparison, rejects stale or future-dated timestamps, then
//! maps invoice events to `PaymentWebhookEvent`.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::ports::{PaymentWebhookEvent, PaymentWebhookVerifier};

use super::webhook_types::{SignatureHeader, StripeInvoice, StripeWebhookEvent};

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed event (5 minutes).
const MAX_TIMESTAMP_AGE_SECS: i64 = 300;

/// Clock skew tolerance for future timestamps.
const MAX_FUTURE_TOLERANCE_SECS: i64 = 60;

pub struct StripeWebhookVerifier {
    secret: SecretString,
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    fn check_signature(
        &self,
        payload: &[u8],
        header: &SignatureHeader,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let now_secs = now.as_datetime().timestamp();
        let age = now_secs - header.timestamp;
        if age > MAX_TIMESTAMP_AGE_SECS {
            tracing::warn!(event_timestamp = header.timestamp, age_secs = age, "Webhook event too old");
            return Err(invalid(format!("event too old ({} seconds)", age)));
        }
        if age < -MAX_FUTURE_TOLERANCE_SECS {
            tracing::warn!(event_timestamp = header.timestamp, "Webhook event from the future");
            return Err(invalid("event timestamp in future"));
        }

        let mut mac = HmacSha256::new_from_slice(self.secret.expose_secret().as_bytes())
            .map_err(|e| DomainError::new(ErrorCode::InternalError, e.to_string()))?;
        mac.update(header.timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        let expected = mac.finalize().into_bytes();

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| expected.as_slice().ct_eq(candidate).unwrap_u8() == 1);
        if !matched {
            tracing::warn!("Invalid webhook signature");
            return Err(invalid("signature mismatch"));
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::new(ErrorCode::InvalidWebhook, message)
}

fn to_payment_event(event: StripeWebhookEvent) -> Result<PaymentWebhookEvent, DomainError> {
    let is_failure = match event.event_type.as_str() {
        "invoice.payment_failed" => true,
        "invoice.payment_succeeded" => false,
        _ => {
            return Ok(PaymentWebhookEvent::Other {
                event_type: event.event_type,
            })
        }
    };

    let invoice: StripeInvoice = serde_json::from_value(event.data.object)
        .map_err(|e| invalid(format!("invalid invoice object: {}", e)))?;
    let Some(external_subscription_id) = invoice.subscription.clone() else {
        // One-off invoices do not belong to a subscription.
        return Ok(PaymentWebhookEvent::Other {
            event_type: event.event_type,
        });
    };

    Ok(if is_failure {
        PaymentWebhookEvent::PaymentFailed {
            external_subscription_id,
            reason: invoice.failure_reason(),
            invoice_id: Some(invoice.id),
        }
    } else {
        PaymentWebhookEvent::PaymentSucceeded {
            external_subscription_id,
            charge_id: invoice.charge_ref(),
            invoice_id: Some(invoice.id),
        }
    })
}

#[async_trait]
impl PaymentWebhookVerifier for StripeWebhookVerifier {
    async fn verify(
        &self,
        payload: &[u8],
        signature: &str,
        now: Timestamp,
    ) -> Result<PaymentWebhookEvent, DomainError> {
        // 1. Parse header
        let header = SignatureHeader::parse(signature).map_err(|e| invalid(e.to_string()))?;

        // 2. Authenticate before touching the body
        self.check_signature(payload, &header, now)?;

        // 3. Parse and map
        let event: StripeWebhookEvent = serde_json::from_slice(payload).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse webhook payload");
            invalid(format!("invalid JSON: {}", e))
        })?;
        tracing::debug!(event_id = %event.id, event_type = %event.event_type, "Webhook verified");
        to_payment_event(event)
    }
}

#[cfg(test)]
pub(crate) fn sign_for_test(secret: &str, payload: &str, timestamp: i64) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        super::webhook_types::hex_encode(&mac.finalize().into_bytes())
    )
}
