//! Recording notification gateway with scripted failures.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::NotificationGateway;

/// One delivered (or attempted) email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Default)]
struct RecordingState {
    attempts: Vec<SentEmail>,
    delivered: Vec<SentEmail>,
    pushes: Vec<(String, String)>,
    /// Failure reasons consumed one per email attempt.
    scripted_failures: VecDeque<String>,
    /// Fail every email to this recipient.
    failing_recipients: Vec<String>,
}

/// Captures every email and push.
///
/// ```ignore
/// let gateway = RecordingNotificationGateway::new();
/// gateway.fail_next(2, "mailbox full");
/// ```
#[derive(Default)]
pub struct RecordingNotificationGateway {
    state: Mutex<RecordingState>,
}

impl RecordingNotificationGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails the next `count` email attempts with `reason`.
    pub fn fail_next(&self, count: usize, reason: &str) {
        let mut state = self.state();
        for _ in 0..count {
            state.scripted_failures.push_back(reason.to_string());
        }
    }

    pub fn fail_recipient(&self, to: &str) {
        self.state().failing_recipients.push(to.to_string());
    }

    pub fn attempts(&self) -> Vec<SentEmail> {
        self.state().attempts.clone()
    }

    pub fn delivered(&self) -> Vec<SentEmail> {
        self.state().delivered.clone()
    }

    /// Delivered emails whose subject contains `fragment`.
    pub fn delivered_with_subject(&self, fragment: &str) -> Vec<SentEmail> {
        self.state()
            .delivered
            .iter()
            .filter(|e| e.subject.contains(fragment))
            .cloned()
            .collect()
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state().pushes.clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingNotificationGateway {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        let email = SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        };
        let mut state = self.state();
        state.attempts.push(email.clone());

        if state.failing_recipients.iter().any(|r| r == to) {
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("recipient {} rejected", to),
            ));
        }
        if let Some(reason) = state.scripted_failures.pop_front() {
            return Err(DomainError::new(ErrorCode::NotificationError, reason));
        }

        state.delivered.push(email);
        Ok(())
    }

    async fn send_push(&self, token: &str, title: &str, _body: &str) -> Result<(), DomainError> {
        self.state()
            .pushes
            .push((token.to_string(), title.to_string()));
        Ok(())
    }
}
