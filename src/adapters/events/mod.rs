//! Event bus adapters.
//!
//! - `InMemoryEventBus` - Capturing bus for tests and local runs
//! - `LoggingEventPublisher` - Writes envelopes to the structured log
//! - `EventBusAccessControl` - Access-control signals as routed envelopes

mod access_control;
mod in_memory;
mod logging;

pub use access_control::{EventBusAccessControl, CANCELLED_ROUTING_KEY, REACTIVATED_ROUTING_KEY};
pub use in_memory::InMemoryEventBus;
pub use logging::LoggingEventPublisher;
