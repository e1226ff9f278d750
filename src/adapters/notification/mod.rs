//! Notification delivery adapters.
//!
//! - `ResendNotificationGateway` - Resend HTTP API
//! - `LoggingNotificationGateway` - log-only delivery
//! - `RecordingNotificationGateway` - capture with scripted failures
//! - `EmailOperationsAlerter` - admin email alerts

mod email_alerter;
mod logging;
mod recording;
mod resend;

pub use email_alerter::EmailOperationsAlerter;
pub use logging::LoggingNotificationGateway;
pub use recording::{RecordingNotificationGateway, SentEmail};
pub use resend::{ResendConfig, ResendNotificationGateway};
