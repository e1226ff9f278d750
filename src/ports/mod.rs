//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Aggregate persistence and time-window queries
//! - `SubscriptionLevelRepository`, `PromotionRepository`, `UserDirectory` - Reference data
//! - `FailedEmailRepository`, `SyncWatermarkStore`, `MetricsStore` - Small stores
//!
//! ## Provider Ports
//!
//! - `PaymentGateway` - Provider subscriptions, charges and refunds
//! - `NotificationGateway` - Email and push delivery
//! - `OperationsAlerter` - Escalation to administrators
//! - `PaymentWebhookVerifier` - Signed payment callbacks
//!
//! ## Integration Ports
//!
//! - `EventPublisher` - Domain events
//! - `AccessControlPublisher` - Entitlement changes
//! - `SyncEndpoint`, `CancellationSink` - CRM/analytics mirroring

mod access_control_publisher;
mod event_publisher;
mod notification_gateway;
mod operations_alerter;
mod payment_gateway;
mod payment_webhook;
mod reference_data;
mod stores;
mod subscription_repository;
mod sync_endpoint;

pub use access_control_publisher::{AccessControlPublisher, AccessSignal};
pub use event_publisher::EventPublisher;
pub use notification_gateway::NotificationGateway;
pub use operations_alerter::OperationsAlerter;
pub use payment_gateway::{GatewayError, GatewayErrorCode, PaymentGateway, ProviderSubscription};
pub use payment_webhook::{PaymentWebhookEvent, PaymentWebhookVerifier};
pub use reference_data::{
    PromotionRepository, SubscriptionLevelRepository, UserContact, UserDirectory,
};
pub use stores::{FailedEmailRepository, MetricsStore, SyncWatermarkStore};
pub use subscription_repository::{PageRequest, SubscriptionRepository};
pub use sync_endpoint::{
    CancellationPayload, CancellationSink, SubscriptionSnapshot, SyncEndpoint,
};
