//! Scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Batch sizes, retention windows and firing hours for the reconciliation jobs
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Subscriptions fetched per page
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Days ahead of the charge that reminders go out
    #[serde(default = "default_reminder_days_before")]
    pub reminder_days_before: i64,

    /// Cancelled subscriptions older than this are archived
    #[serde(default = "default_cancelled_retention_days")]
    pub cancelled_retention_days: i64,

    /// Inactive subscriptions untouched this long are deleted
    #[serde(default = "default_inactive_deletion_days")]
    pub inactive_deletion_days: i64,

    /// Upper bound on each gateway, email or sync call
    #[serde(default = "default_external_call_timeout")]
    pub external_call_timeout_secs: u64,

    #[serde(default)]
    pub hours: JobHours,
}

/// UTC hour at which each daily job fires
#[derive(Debug, Clone, Deserialize)]
pub struct JobHours {
    #[serde(default = "hour_0")]
    pub renewal: u32,
    #[serde(default = "hour_3")]
    pub expiration: u32,
    #[serde(default = "hour_4")]
    pub trial_end: u32,
    #[serde(default = "hour_10")]
    pub payment_reminder: u32,
    #[serde(default = "hour_5")]
    pub cleanup: u32,
    #[serde(default = "hour_4")]
    pub data_sync: u32,
    #[serde(default = "hour_3")]
    pub metrics_aggregation: u32,
}

impl SchedulerConfig {
    pub fn external_call_timeout(&self) -> Duration {
        Duration::from_secs(self.external_call_timeout_secs)
    }

    /// Validate scheduler configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::MustBePositive("scheduler.batch_size"));
        }
        if self.reminder_days_before <= 0 {
            return Err(ValidationError::MustBePositive("scheduler.reminder_days_before"));
        }
        if self.cancelled_retention_days <= 0 {
            return Err(ValidationError::MustBePositive("scheduler.cancelled_retention_days"));
        }
        if self.inactive_deletion_days <= 0 {
            return Err(ValidationError::MustBePositive("scheduler.inactive_deletion_days"));
        }
        if self.external_call_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        self.hours.validate()
    }
}

impl JobHours {
    fn validate(&self) -> Result<(), ValidationError> {
        let hours = [
            ("scheduler.hours.renewal", self.renewal),
            ("scheduler.hours.expiration", self.expiration),
            ("scheduler.hours.trial_end", self.trial_end),
            ("scheduler.hours.payment_reminder", self.payment_reminder),
            ("scheduler.hours.cleanup", self.cleanup),
            ("scheduler.hours.data_sync", self.data_sync),
            ("scheduler.hours.metrics_aggregation", self.metrics_aggregation),
        ];
        match hours.into_iter().find(|(_, hour)| *hour > 23) {
            Some((field, _)) => Err(ValidationError::InvalidHour(field)),
            None => Ok(()),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            reminder_days_before: default_reminder_days_before(),
            cancelled_retention_days: default_cancelled_retention_days(),
            inactive_deletion_days: default_inactive_deletion_days(),
            external_call_timeout_secs: default_external_call_timeout(),
            hours: JobHours::default(),
        }
    }
}

impl Default for JobHours {
    fn default() -> Self {
        Self {
            renewal: 0,
            expiration: 3,
            trial_end: 4,
            payment_reminder: 10,
            cleanup: 5,
            data_sync: 4,
            metrics_aggregation: 3,
        }
    }
}

fn default_batch_size() -> usize {
    100
}

fn default_reminder_days_before() -> i64 {
    3
}

fn default_cancelled_retention_days() -> i64 {
    90
}

fn default_inactive_deletion_days() -> i64 {
    365
}

fn default_external_call_timeout() -> u64 {
    10
}

fn hour_0() -> u32 {
    0
}

fn hour_3() -> u32 {
    3
}

fn hour_4() -> u32 {
    4
}

fn hour_5() -> u32 {
    5
}

fn hour_10() -> u32 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduler_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.reminder_days_before, 3);
        assert_eq!(config.cancelled_retention_days, 90);
        assert_eq!(config.inactive_deletion_days, 365);
        assert_eq!(config.external_call_timeout(), Duration::from_secs(10));
        assert_eq!(config.hours.renewal, 0);
        assert_eq!(config.hours.payment_reminder, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_hours_keep_defaults() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"hours": {"cleanup": 2}}"#).unwrap();
        assert_eq!(config.hours.cleanup, 2);
        assert_eq!(config.hours.expiration, 3);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let config = SchedulerConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::MustBePositive("scheduler.batch_size"))
        );
    }

    #[test]
    fn test_out_of_range_hour_rejected() {
        let mut config = SchedulerConfig::default();
        config.hours.trial_end = 24;
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidHour("scheduler.hours.trial_end"))
        );
    }
}
