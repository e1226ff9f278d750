//! Notification delivery policies.

mod dispatcher;

pub use dispatcher::{DispatchOutcome, NotificationDispatcher, WelcomeOutcome, MAX_RETRIES};
