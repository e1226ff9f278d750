//! Access-control signals carried over the event bus.
//!
//! The access-control service listens on two routing keys:
//!
//! | Routing key | Meaning |
//! |-------------|---------|
//! | `subscription.cancelled` | revoke content access |
//! | `subscription.reactivated` | restore content access |

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, EventEnvelope};
use crate::ports::{AccessControlPublisher, AccessSignal, EventPublisher};

pub const CANCELLED_ROUTING_KEY: &str = "subscription.cancelled";
pub const REACTIVATED_ROUTING_KEY: &str = "subscription.reactivated";

/// Publishes access signals as routed envelopes.
pub struct EventBusAccessControl {
    publisher: Arc<dyn EventPublisher>,
}

impl EventBusAccessControl {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    async fn send(
        &self,
        event_type: &str,
        routing_key: &str,
        signal: AccessSignal,
    ) -> Result<(), DomainError> {
        let payload = serde_json::to_value(&signal).map_err(|e| {
            DomainError::new(
                ErrorCode::InternalError,
                format!("Failed to serialize access signal: {}", e),
            )
        })?;
        let mut envelope = EventEnvelope::new(
            event_type,
            signal.subscription_id.to_string(),
            "Subscription",
            payload,
        )
        .with_routing_key(routing_key)
        .with_user_id(signal.user_id.as_str());
        envelope.occurred_at = signal.occurred_at;

        self.publisher.publish(envelope).await
    }
}

#[async_trait]
impl AccessControlPublisher for EventBusAccessControl {
    async fn subscription_cancelled(&self, signal: AccessSignal) -> Result<(), DomainError> {
        self.send("access.revoked.v1", CANCELLED_ROUTING_KEY, signal)
            .await
    }

    async fn subscription_reactivated(&self, signal: AccessSignal) -> Result<(), DomainError> {
        self.send("access.restored.v1", REACTIVATED_ROUTING_KEY, signal)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::events::InMemoryEventBus;
    use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

    fn signal() -> AccessSignal {
        AccessSignal {
            user_id: UserId::new("user-1").unwrap(),
            subscription_id: SubscriptionId::new(),
            level: "Premium".to_string(),
            reason: "moving abroad".to_string(),
            occurred_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn cancellation_is_routed() {
        let bus = Arc::new(InMemoryEventBus::new());
        let access = EventBusAccessControl::new(bus.clone());
        let signal = signal();

        access.subscription_cancelled(signal.clone()).await.unwrap();

        let events = bus.events_routed_to(CANCELLED_ROUTING_KEY);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].aggregate_id, signal.subscription_id.to_string());
        assert_eq!(events[0].metadata.user_id.as_deref(), Some("user-1"));
        assert_eq!(events[0].payload["level"], "Premium");
    }

    #[tokio::test]
    async fn reactivation_is_routed() {
        let bus = Arc::new(InMemoryEventBus::new());
        let access = EventBusAccessControl::new(bus.clone());

        access.subscription_reactivated(signal()).await.unwrap();

        assert_eq!(bus.events_routed_to(REACTIVATED_ROUTING_KEY).len(), 1);
        assert!(bus.events_routed_to(CANCELLED_ROUTING_KEY).is_empty());
    }

    #[tokio::test]
    async fn bus_failure_is_returned() {
        let bus = Arc::new(InMemoryEventBus::new());
        bus.fail_publishing(true);
        let access = EventBusAccessControl::new(bus);

        assert!(access.subscription_cancelled(signal()).await.is_err());
    }
}
