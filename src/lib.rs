//! Videoflix Billing - subscription lifecycle, payments and reconciliation
//!
//! This crate owns the billing side of the Videoflix streaming service:
//! pricing and proration, the subscription state machine, subscriber
//! notifications, the nightly reconciliation jobs and downstream sync.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
