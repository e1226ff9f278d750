//! ChangeSubscriptionLevelHandler - Replaces the plan of a subscription.

use std::sync::Arc;

use tracing::info;

use crate::application::notifications::NotificationDispatcher;
use crate::application::publishing::{level_display_name, lookup_level, publish_after_commit};
use crate::domain::foundation::{EventId, SubscriptionId, SubscriptionLevelId, Timestamp};
use crate::domain::notification::NotificationKind;
use crate::domain::subscription::{Subscription, SubscriptionError, SubscriptionLevelChanged};
use crate::ports::{EventPublisher, SubscriptionLevelRepository, SubscriptionRepository};

#[derive(Debug, Clone)]
pub struct ChangeSubscriptionLevelCommand {
    pub subscription_id: SubscriptionId,
    pub new_level_id: SubscriptionLevelId,
}

#[derive(Debug, Clone)]
pub struct ChangeSubscriptionLevelResult {
    pub subscription: Subscription,
    /// None when the requested level was already current.
    pub previous_level_id: Option<SubscriptionLevelId>,
}

pub struct ChangeSubscriptionLevelHandler {
    repository: Arc<dyn SubscriptionRepository>,
    levels: Arc<dyn SubscriptionLevelRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    dispatcher: Arc<NotificationDispatcher>,
}

impl ChangeSubscriptionLevelHandler {
    pub fn new(
        repository: Arc<dyn SubscriptionRepository>,
        levels: Arc<dyn SubscriptionLevelRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        Self {
            repository,
            levels,
            event_publisher,
            dispatcher,
        }
    }

    pub async fn handle(
        &self,
        cmd: ChangeSubscriptionLevelCommand,
    ) -> Result<ChangeSubscriptionLevelResult, SubscriptionError> {
        let now = Timestamp::now();

        // 1. Load subscription and target level
        let mut subscription = self
            .repository
            .find_by_id(&cmd.subscription_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("subscription", cmd.subscription_id))?;

        let new_level = self
            .levels
            .find_by_id(&cmd.new_level_id)
            .await?
            .ok_or_else(|| SubscriptionError::not_found("subscription_level", cmd.new_level_id))?;

        // 2. Replace (no-op when unchanged)
        let Some(previous_level_id) = subscription.change_level(new_level.id, now) else {
            return Ok(ChangeSubscriptionLevelResult {
                subscription,
                previous_level_id: None,
            });
        };

        // 3. Persist
        self.repository.update(&subscription).await?;

        let previous = lookup_level(self.levels.as_ref(), &previous_level_id).await;
        let previous_level_name = level_display_name(previous.as_ref());

        info!(
            subscription_id = %subscription.id,
            from = %previous_level_name,
            to = new_level.name(),
            "Subscription level changed"
        );

        // 4. Domain event
        let event = SubscriptionLevelChanged {
            event_id: EventId::new(),
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            previous_level_id,
            previous_level_name: previous_level_name.clone(),
            new_level_id: new_level.id,
            new_level_name: new_level.name().to_string(),
            changed_at: now,
        };
        publish_after_commit(self.event_publisher.as_ref(), &event).await;

        // 5. Tell the subscriber
        self.dispatcher
            .notify_user(
                &subscription.user_id,
                &NotificationKind::LevelChanged {
                    previous_level_name,
                    new_level_name: new_level.name().to_string(),
                },
            )
            .await;

        Ok(ChangeSubscriptionLevelResult {
            subscription,
            previous_level_id: Some(previous_level_id),
        })
    }
}
