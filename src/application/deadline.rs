//! Deadlines for calls to external systems.
//!
//! Every payment, notification and sync call goes through `CallDeadline` so
//! a hung provider surfaces as an ordinary failure.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::GatewayError;

/// Upper bound applied to a single external call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallDeadline(Duration);

impl CallDeadline {
    pub fn new(limit: Duration) -> Self {
        Self(limit)
    }

    pub fn from_secs(secs: u64) -> Self {
        Self(Duration::from_secs(secs))
    }

    pub fn limit(&self) -> Duration {
        self.0
    }

    /// Runs a payment gateway call; expiry becomes `GatewayErrorCode::Timeout`.
    pub async fn payment<T, F>(&self, call: F) -> Result<T, GatewayError>
    where
        F: Future<Output = Result<T, GatewayError>>,
    {
        match timeout(self.0, call).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::timeout(self.0.as_secs())),
        }
    }

    /// Runs any other outbound call; expiry becomes a `DomainError` with `code`.
    pub async fn outbound<T, F>(&self, code: ErrorCode, call: F) -> Result<T, DomainError>
    where
        F: Future<Output = Result<T, DomainError>>,
    {
        match timeout(self.0, call).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::new(
                code,
                format!("no response within {}s", self.0.as_secs()),
            )),
        }
    }
}

impl Default for CallDeadline {
    fn default() -> Self {
        Self::from_secs(10)
    }
}
