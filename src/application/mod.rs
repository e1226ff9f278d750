//! Application layer - command handlers, delivery policies and batch jobs.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Handlers serve the synchronous paths (user actions and payment callbacks);
//! the scheduler drives the reconciliation jobs.

mod deadline;
pub mod handlers;
pub mod notifications;
pub mod publishing;
pub mod scheduler;
pub mod sync;

#[cfg(test)]
pub(crate) mod test_support;

pub use deadline::CallDeadline;
pub use notifications::{DispatchOutcome, NotificationDispatcher, WelcomeOutcome};
pub use sync::{DataSynchronizer, EndpointOutcome, SyncReport};
