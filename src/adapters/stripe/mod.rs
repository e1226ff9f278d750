//! Stripe payment adapters.
//!
//! - `StripePaymentGateway` - REST client for subscriptions, charges and refunds
//! - `StripeWebhookVerifier` - signed callback verification
//! - `MockPaymentGateway` - in-process gateway for tests and local runs
//!
//! # Security
//!
//! - Webhook signatures use HMAC-SHA256 with constant-time comparison
//! - Timestamps older than 5 minutes are rejected
//! - Secrets are held as `secrecy::SecretString`

mod mock_gateway;
mod stripe_gateway;
mod webhook_types;
mod webhook_verifier;

pub use mock_gateway::{MethodCall, MockPaymentGateway};
pub use stripe_gateway::{StripeConfig, StripePaymentGateway, DEFAULT_STRIPE_API_BASE};
pub use webhook_types::{SignatureHeader, SignatureParseError, StripeInvoice, StripeWebhookEvent};
pub use webhook_verifier::StripeWebhookVerifier;

#[cfg(test)]
pub(crate) use webhook_verifier::sign_for_test;
