//! Record of a notification that exhausted its delivery attempts.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{FailedEmailId, Timestamp, ValidationError};

/// Immutable once created; kept for operator follow-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEmail {
    pub id: FailedEmailId,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub attempt_count: u32,
    pub failure_reason: String,
    pub created_at: Timestamp,
}

impl FailedEmail {
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        attempt_count: u32,
        failure_reason: impl Into<String>,
        created_at: Timestamp,
    ) -> Result<Self, ValidationError> {
        let recipient = recipient.into();
        if recipient.trim().is_empty() {
            return Err(ValidationError::empty_field("recipient"));
        }
        if attempt_count == 0 {
            return Err(ValidationError::out_of_range(
                "attempt_count",
                1,
                i64::from(u32::MAX),
                0,
            ));
        }
        Ok(Self {
            id: FailedEmailId::new(),
            recipient,
            subject: subject.into(),
            body: body.into(),
            attempt_count,
            failure_reason: failure_reason.into(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_recipient_and_attempts() {
        let now = Timestamp::now();
        assert!(FailedEmail::new("", "s", "b", 3, "r", now).is_err());
        assert!(FailedEmail::new("a@b.c", "s", "b", 0, "r", now).is_err());

        let record = FailedEmail::new("a@b.c", "s", "b", 3, "timeout", now).unwrap();
        assert_eq!(record.attempt_count, 3);
        assert_eq!(record.failure_reason, "timeout");
    }
}
