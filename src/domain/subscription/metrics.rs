//! Daily subscription metrics.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Named metric values recorded for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyMetrics {
    pub day: NaiveDate,
    pub new_subscriptions: i64,
    pub cancelled_subscriptions: i64,
    /// Sum of level prices, in cents, for subscriptions created that day.
    pub daily_revenue_cents: i64,
    pub active_subscriptions_end: i64,
}

impl DailyMetrics {
    pub fn empty(day: NaiveDate) -> Self {
        Self {
            day,
            new_subscriptions: 0,
            cancelled_subscriptions: 0,
            daily_revenue_cents: 0,
            active_subscriptions_end: 0,
        }
    }

    /// Metric name/value pairs in storage order.
    pub fn entries(&self) -> [(&'static str, i64); 4] {
        [
            ("new_subscriptions", self.new_subscriptions),
            ("cancelled_subscriptions", self.cancelled_subscriptions),
            ("daily_revenue", self.daily_revenue_cents),
            ("active_subscriptions_end", self.active_subscriptions_end),
        ]
    }
}
