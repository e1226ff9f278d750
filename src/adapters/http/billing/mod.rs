//! Billing HTTP adapter: Stripe webhook ingestion and health.

mod dto;
mod handlers;
mod routes;

pub use dto::{ErrorResponse, HealthResponse, WebhookAckResponse};
pub use handlers::{BillingAppState, SubscriptionApiError, STRIPE_SIGNATURE_HEADER};
pub use routes::billing_router;
