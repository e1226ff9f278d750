//! Recording sync endpoints for tests and dry runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::{CancellationPayload, CancellationSink, SubscriptionSnapshot, SyncEndpoint};

/// Captures every pushed batch.
pub struct RecordingSyncEndpoint {
    name: String,
    batches: Mutex<Vec<Vec<SubscriptionSnapshot>>>,
    failing: AtomicBool,
}

impl RecordingSyncEndpoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            batches: Mutex::new(Vec::new()),
            failing: AtomicBool::new(false),
        }
    }

    /// Rejects subsequent pushes (still recorded as calls).
    pub fn fail_pushes(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn batches(&self) -> Vec<Vec<SubscriptionSnapshot>> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn call_count(&self) -> usize {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait]
impl SyncEndpoint for RecordingSyncEndpoint {
    fn name(&self) -> &str {
        &self.name
    }

    async fn push(&self, batch: &[SubscriptionSnapshot]) -> Result<(), DomainError> {
        self.batches
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch.to_vec());
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::SyncEndpointError,
                format!("{} rejected batch", self.name),
            ));
        }
        Ok(())
    }
}

/// Captures cancellation payloads.
#[derive(Default)]
pub struct RecordingCancellationSink {
    payloads: Mutex<Vec<CancellationPayload>>,
    failing: AtomicBool,
}

impl RecordingCancellationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_notifications(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn payloads(&self) -> Vec<CancellationPayload> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl CancellationSink for RecordingCancellationSink {
    async fn notify(&self, payload: &CancellationPayload) -> Result<(), DomainError> {
        self.payloads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(payload.clone());
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::new(
                ErrorCode::SyncEndpointError,
                "cancellation feed rejected payload",
            ));
        }
        Ok(())
    }
}
