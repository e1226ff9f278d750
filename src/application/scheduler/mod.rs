//! Reconciliation scheduler: timer-driven batch jobs over subscriptions.
//!
//! | Job | Default firing | Effect |
//! |-----|----------------|--------|
//! | `renewal` | daily 00:00 UTC | charges due auto-renewals |
//! | `expiration` | daily 03:00 UTC | warns today's endings, expires lapsed |
//! | `trial_end` | daily 04:00 UTC | warns today's trial endings, closes lapsed trials |
//! | `payment_reminder` | daily 10:00 UTC | reminds upcoming charges |
//! | `cleanup` | daily 05:00 UTC | archives old cancellations, deletes dormant rows |
//! | `data_sync` | daily 04:00 UTC | pushes changes downstream |
//! | `metrics_aggregation` | daily 03:00 UTC | records yesterday's metrics |
//!
//! Sweeps that move rows out of their own query (expire, trial end,
//! archive, delete, renewal) advance the page offset only by the rows left
//! behind, so no row is skipped while the result set shrinks.

mod cleanup;
mod data_sync;
mod expiration;
mod job;
mod metrics_aggregation;
mod payment_reminder;
mod renewal;
mod runner;
mod trial_end;

pub use cleanup::{
    InactiveSubscriptionCleanupTask, DEFAULT_CANCELLED_RETENTION_DAYS,
    DEFAULT_INACTIVE_DELETION_DAYS,
};
pub use data_sync::DataSynchronizationTask;
pub use expiration::ExpirationTask;
pub use job::{JobReport, JobSchedule, ScheduledJob, DEFAULT_BATCH_SIZE};
pub use metrics_aggregation::SubscriptionMetricsAggregationTask;
pub use payment_reminder::{PaymentReminderTask, DEFAULT_REMINDER_DAYS_BEFORE};
pub use renewal::RenewalTask;
pub use runner::SchedulerRunner;
pub use trial_end::TrialPeriodEndTask;
