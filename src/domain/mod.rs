//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors, events)
//! - `subscription` - Subscription lifecycle, plans, promotions and billing dates
//! - `notification` - Notification templates and failed delivery records

pub mod foundation;
pub mod notification;
pub mod subscription;
