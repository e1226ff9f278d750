//! Subscription domain - lifecycle, plans, promotions and billing dates.
//!
//! # Module Structure
//!
//! - `aggregate` - Subscription aggregate and its transition methods
//! - `status` - Lifecycle status and transition table
//! - `level` - Plan reference data and billing frequency
//! - `promotion` - Time-boxed discount codes
//! - `billing` - Billing date arithmetic
//! - `events` - Domain events
//! - `metrics` - Daily aggregates
//! - `errors` - Subscription error taxonomy

mod aggregate;
mod billing;
mod errors;
mod events;
mod level;
mod metrics;
mod promotion;
mod status;

pub use aggregate::{NewSubscription, Subscription};
pub use billing::{BillingCalculator, ReactivationDate};
pub use errors::SubscriptionError;
pub use events::{
    SubscriptionCancelled, SubscriptionCreated, SubscriptionExpired, SubscriptionLevelChanged,
    SubscriptionPaymentFailed, SubscriptionPaymentRecovered, SubscriptionReactivated,
    SubscriptionRenewed, SubscriptionTrialEnded,
};
pub use level::{BillingFrequency, LevelTier, SubscriptionLevel};
pub use metrics::DailyMetrics;
pub use promotion::Promotion;
pub use status::SubscriptionStatus;
