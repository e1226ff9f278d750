//! Post-commit side effects shared by handlers and jobs.
//!
//! Events are published only after the state change is durable. A publish
//! failure at that point cannot roll the write back, so it is logged at
//! error and the operation still succeeds.

use tracing::error;

use crate::domain::foundation::{SerializableDomainEvent, SubscriptionLevelId};
use crate::domain::subscription::SubscriptionLevel;
use crate::ports::{EventPublisher, SubscriptionLevelRepository};

/// Publishes `event`, logging instead of returning failures.
pub async fn publish_after_commit<E: SerializableDomainEvent>(
    publisher: &dyn EventPublisher,
    event: &E,
) {
    let envelope = match event.to_envelope() {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(
                event_type = event.event_type(),
                aggregate_id = %event.aggregate_id(),
                error = %e,
                "Failed to build event envelope"
            );
            return;
        }
    };

    if let Err(e) = publisher.publish(envelope).await {
        error!(
            event_type = event.event_type(),
            aggregate_id = %event.aggregate_id(),
            error = %e,
            "Event publish failed after commit"
        );
    }
}

/// Best-effort level lookup for names in notifications and signals.
pub async fn lookup_level(
    levels: &dyn SubscriptionLevelRepository,
    id: &SubscriptionLevelId,
) -> Option<SubscriptionLevel> {
    match levels.find_by_id(id).await {
        Ok(level) => level,
        Err(e) => {
            error!(level_id = %id, error = %e, "Level lookup failed");
            None
        }
    }
}

/// Display name of a level, empty when unknown.
pub fn level_display_name(level: Option<&SubscriptionLevel>) -> String {
    level.map(|l| l.name().to_string()).unwrap_or_default()
}
