//! HTTP adapters - axum boundary of the service.
//!
//! Only provider callbacks and a health probe are exposed; subscription
//! lifecycle operations are invoked in-process.

pub mod billing;

pub use billing::{billing_router, BillingAppState, SubscriptionApiError};
