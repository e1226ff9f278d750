//! Response bodies for the billing endpoints.

use serde::{Deserialize, Serialize};

use crate::application::handlers::WebhookOutcome;

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling.
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
        }
    }
}

/// Acknowledgement returned to the payment provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAckResponse {
    pub received: bool,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

impl From<WebhookOutcome> for WebhookAckResponse {
    fn from(outcome: WebhookOutcome) -> Self {
        let (label, subscription_id) = match outcome {
            WebhookOutcome::PaymentFailed { subscription_id } => {
                ("payment_failed", Some(subscription_id.to_string()))
            }
            WebhookOutcome::PaymentRecovered { subscription_id } => {
                ("payment_recovered", Some(subscription_id.to_string()))
            }
            WebhookOutcome::Acknowledged => ("acknowledged", None),
            WebhookOutcome::Ignored => ("ignored", None),
        };
        Self {
            received: true,
            outcome: label.to_string(),
            subscription_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
