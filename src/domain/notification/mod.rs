//! Notification domain - message kinds, templates and failure records.

mod failed_email;
mod template;

pub use failed_email::FailedEmail;
pub use template::{delivery_failure_alert, welcome_failure_body, NotificationKind, RenderedMessage};
