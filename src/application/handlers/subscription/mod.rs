//! Subscription lifecycle command handlers.

mod apply_promotion;
mod cancel_subscription;
mod change_subscription_level;
mod create_subscription;
mod handle_payment_webhook;
mod reactivate_subscription;
mod record_payment_failure;
mod record_payment_success;
mod record_renewal;

pub use apply_promotion::{ApplyPromotionCommand, ApplyPromotionHandler, ApplyPromotionResult};
pub use cancel_subscription::{
    CancelSubscriptionCommand, CancelSubscriptionHandler, CancelSubscriptionResult,
    DEFAULT_REFUND_WINDOW_DAYS,
};
pub use change_subscription_level::{
    ChangeSubscriptionLevelCommand, ChangeSubscriptionLevelHandler, ChangeSubscriptionLevelResult,
};
pub use create_subscription::{
    CreateSubscriptionCommand, CreateSubscriptionHandler, CreateSubscriptionResult,
};
pub use handle_payment_webhook::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, WebhookOutcome,
};
pub use reactivate_subscription::{
    ReactivateSubscriptionCommand, ReactivateSubscriptionHandler, ReactivateSubscriptionResult,
};
pub use record_payment_failure::{
    RecordPaymentFailureCommand, RecordPaymentFailureHandler, RecordPaymentFailureResult,
};
pub use record_payment_success::{
    RecordPaymentSuccessCommand, RecordPaymentSuccessHandler, RecordPaymentSuccessResult,
};
pub use record_renewal::{RecordRenewalCommand, RecordRenewalHandler};
