//! Payment gateway port for external payment processing.
//!
//! Defines the contract for the payment provider (e.g., Stripe) used by the
//! subscription lifecycle: creating provider subscriptions, charging and
//! refunding.
//!
//! # Design
//!
//! - **Gateway agnostic**: Works with any provider exposing customer/price references
//! - **Single failure category**: Every provider failure surfaces as `GatewayError`
//! - **Timeouts are failures**: Callers wrap calls in a deadline and map expiry
//!   to `GatewayErrorCode::Timeout`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};
use crate::domain::subscription::SubscriptionError;

/// Port for payment provider integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a recurring subscription for `customer_ref` on `price_ref`.
    async fn create_subscription(
        &self,
        customer_ref: &str,
        price_ref: &str,
    ) -> Result<ProviderSubscription, GatewayError>;

    /// Creates a recurring subscription whose first charge happens after `trial_end`.
    async fn create_subscription_with_trial(
        &self,
        customer_ref: &str,
        price_ref: &str,
        trial_end: Timestamp,
    ) -> Result<ProviderSubscription, GatewayError>;

    /// Charges a one-off amount. Returns the provider's charge ID.
    async fn charge(
        &self,
        customer_ref: &str,
        amount_cents: i64,
        currency: &str,
        description: &str,
    ) -> Result<String, GatewayError>;

    /// Refunds a charge (or payment intent). Returns the provider's refund ID.
    async fn refund(&self, charge_ref: &str, reason: &str) -> Result<String, GatewayError>;
}

/// Provider references returned when a subscription is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSubscription {
    /// Provider subscription ID (`sub_...`).
    pub subscription_ref: String,
    /// Charge or payment intent of the first invoice. `None` while a trial
    /// defers the first payment.
    pub latest_charge_ref: Option<String>,
}

/// Errors from payment provider operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayError {
    /// Error code for categorization.
    pub code: GatewayErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,
}

impl GatewayError {
    pub fn new(code: GatewayErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::NetworkError, message)
    }

    pub fn timeout(seconds: u64) -> Self {
        Self::new(
            GatewayErrorCode::Timeout,
            format!("no response within {}s", seconds),
        )
    }

    pub fn card_declined(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::CardDeclined, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(GatewayErrorCode::ProviderError, message)
    }

    /// Returns true if the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl std::fmt::Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<GatewayError> for DomainError {
    fn from(err: GatewayError) -> Self {
        let mut domain = DomainError::new(ErrorCode::PaymentGatewayError, err.message)
            .with_detail("gateway_code", err.code.to_string());
        if let Some(provider_code) = err.provider_code {
            domain = domain.with_detail("provider_code", provider_code);
        }
        domain
    }
}

impl From<GatewayError> for SubscriptionError {
    fn from(err: GatewayError) -> Self {
        SubscriptionError::gateway("payment", err.to_string())
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// No response within the configured deadline.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Card was declined.
    CardDeclined,

    /// Customer, price or charge not found at the provider.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,
}

impl GatewayErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GatewayErrorCode::NetworkError
                | GatewayErrorCode::Timeout
                | GatewayErrorCode::RateLimitExceeded
        )
    }
}

impl std::fmt::Display for GatewayErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            GatewayErrorCode::NetworkError => "network_error",
            GatewayErrorCode::Timeout => "timeout",
            GatewayErrorCode::AuthenticationError => "authentication_error",
            GatewayErrorCode::CardDeclined => "card_declined",
            GatewayErrorCode::NotFound => "not_found",
            GatewayErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            GatewayErrorCode::ProviderError => "provider_error",
        };
        write!(f, "{}", s)
    }
}
