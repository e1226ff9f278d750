//! HandlePaymentWebhookHandler - Routes verified payment callbacks.
//!
//! Signature verification happens before any state is touched. Callbacks
//! for subscriptions this service does not know are acknowledged so the
//! provider stops redelivering them.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::foundation::{SubscriptionId, Timestamp};
use crate::domain::subscription::SubscriptionError;
use crate::ports::{PaymentWebhookEvent, PaymentWebhookVerifier};

use super::{
    RecordPaymentFailureCommand, RecordPaymentFailureHandler, RecordPaymentSuccessCommand,
    RecordPaymentSuccessHandler,
};

/// Raw callback as received over HTTP.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    pub payload: Vec<u8>,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    PaymentFailed { subscription_id: SubscriptionId },
    PaymentRecovered { subscription_id: SubscriptionId },
    /// Valid callback that required no state change.
    Acknowledged,
    /// Callback type or subscription this service does not handle.
    Ignored,
}

pub struct HandlePaymentWebhookHandler {
    verifier: Arc<dyn PaymentWebhookVerifier>,
    failure: Arc<RecordPaymentFailureHandler>,
    success: Arc<RecordPaymentSuccessHandler>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        verifier: Arc<dyn PaymentWebhookVerifier>,
        failure: Arc<RecordPaymentFailureHandler>,
        success: Arc<RecordPaymentSuccessHandler>,
    ) -> Self {
        Self {
            verifier,
            failure,
            success,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<WebhookOutcome, SubscriptionError> {
        // 1. Verify
        let event = self
            .verifier
            .verify(&cmd.payload, &cmd.signature, Timestamp::now())
            .await?;

        // 2. Route
        let result = match event {
            PaymentWebhookEvent::PaymentFailed {
                external_subscription_id,
                invoice_id,
                reason,
            } => self
                .failure
                .handle(RecordPaymentFailureCommand {
                    external_subscription_id,
                    invoice_id,
                    reason,
                })
                .await
                .map(|r| {
                    if r.changed {
                        WebhookOutcome::PaymentFailed {
                            subscription_id: r.subscription.id,
                        }
                    } else {
                        WebhookOutcome::Acknowledged
                    }
                }),
            PaymentWebhookEvent::PaymentSucceeded {
                external_subscription_id,
                invoice_id,
                charge_id,
            } => self
                .success
                .handle(RecordPaymentSuccessCommand {
                    external_subscription_id,
                    invoice_id,
                    charge_id,
                })
                .await
                .map(|r| {
                    if r.changed {
                        WebhookOutcome::PaymentRecovered {
                            subscription_id: r.subscription.id,
                        }
                    } else {
                        WebhookOutcome::Acknowledged
                    }
                }),
            PaymentWebhookEvent::Other { event_type } => {
                debug!(event_type = %event_type, "Unhandled webhook type");
                return Ok(WebhookOutcome::Ignored);
            }
        };

        match result {
            Err(SubscriptionError::NotFound { resource, id }) if resource == "subscription" => {
                warn!(external_subscription_id = %id, "Webhook for unknown subscription");
                Ok(WebhookOutcome::Ignored)
            }
            other => other,
        }
    }
}
