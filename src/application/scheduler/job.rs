//! Scheduled job contract, per-run report and firing schedule.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use tracing::{info, warn};

use crate::domain::foundation::Timestamp;

/// Default number of subscriptions fetched per page.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// A batch job run by the scheduler.
///
/// Implementations isolate per-item failures: one bad subscription is
/// counted and logged, the rest of the batch still runs.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    /// Stable name used in logs and configuration.
    fn name(&self) -> &'static str;

    /// Runs one pass evaluated against `now`.
    async fn run(&self, now: Timestamp) -> JobReport;
}

/// Counters for one job run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobReport {
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Set when a page query failed and the sweep stopped early.
    pub aborted: bool,
}

impl JobReport {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn success(&mut self) {
        self.processed += 1;
        self.succeeded += 1;
    }

    pub fn failure(&mut self) {
        self.processed += 1;
        self.failed += 1;
    }

    pub fn skip(&mut self) {
        self.processed += 1;
        self.skipped += 1;
    }

    /// Adds the counters of another sweep of the same run.
    pub fn merge(&mut self, other: JobReport) {
        self.processed += other.processed;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.aborted |= other.aborted;
    }

    /// Rows a mutating sweep leaves behind in its own query.
    pub fn remaining(&self) -> usize {
        self.failed + self.skipped
    }

    pub fn log(&self, job: &str) {
        if self.aborted || self.failed > 0 {
            warn!(
                job,
                processed = self.processed,
                succeeded = self.succeeded,
                failed = self.failed,
                skipped = self.skipped,
                aborted = self.aborted,
                "Job finished with failures"
            );
        } else {
            info!(
                job,
                processed = self.processed,
                succeeded = self.succeeded,
                skipped = self.skipped,
                "Job finished"
            );
        }
    }
}

/// When a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobSchedule {
    /// Once a day at the given UTC time.
    DailyAt { hour: u32, minute: u32 },
    /// Repeatedly, `Duration` after the previous run finished.
    Every(Duration),
}

impl JobSchedule {
    /// Time to wait from `now` until the next firing.
    pub fn delay_from(&self, now: DateTime<Utc>) -> Duration {
        match *self {
            JobSchedule::Every(interval) => interval,
            JobSchedule::DailyAt { hour, minute } => {
                let at = NaiveTime::from_hms_opt(hour.min(23), minute.min(59), 0)
                    .unwrap_or(NaiveTime::MIN);
                let mut next = Utc.from_utc_datetime(&now.date_naive().and_time(at));
                if next <= now {
                    next += chrono::Duration::days(1);
                }
                (next - now).to_std().unwrap_or(Duration::ZERO)
            }
        }
    }
}
