//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the application to external systems:
//! - `events` - Event bus and access-control bridge
//! - `http` - axum boundary (webhooks, health)
//! - `memory` - In-memory persistence for tests and local runs
//! - `notification` - Resend, log-only and recording gateways plus admin alerts
//! - `postgres` - sqlx persistence
//! - `stripe` - Payment gateway and webhook verification
//! - `sync` - CRM and analytics push endpoints

pub mod events;
pub mod http;
pub mod memory;
pub mod notification;
pub mod postgres;
pub mod stripe;
pub mod sync;

pub use events::{EventBusAccessControl, InMemoryEventBus, LoggingEventPublisher};
