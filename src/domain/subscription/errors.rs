//! Subscription-specific error types.
//!
//! # HTTP Status Mapping
//!
//! Applied by the HTTP adapter, never inside the core.
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | Validation | 400 |
//! | NotFound | 404 |
//! | InvalidState | 409 |
//! | Gateway | 503 |
//! | Persistence | 500 |
//! | Internal | 500 |

use crate::domain::foundation::{DomainError, ErrorCode, ValidationError};

/// Subscription lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Bad input to create/update. Surfaced to the caller, never retried.
    Validation { field: String, message: String },

    /// A required entity does not exist.
    NotFound { resource: &'static str, id: String },

    /// The requested transition is not allowed from the current status.
    InvalidState { current: String, attempted: String },

    /// Payment, notification or sync provider failure (including timeouts).
    Gateway { service: String, message: String },

    /// The primary write did not become durable.
    Persistence(String),

    /// Anything unexpected.
    Internal(String),
}

impl SubscriptionError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str, id: impl ToString) -> Self {
        SubscriptionError::NotFound {
            resource,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(current: impl ToString, attempted: impl Into<String>) -> Self {
        SubscriptionError::InvalidState {
            current: current.to_string(),
            attempted: attempted.into(),
        }
    }

    pub fn gateway(service: impl Into<String>, message: impl Into<String>) -> Self {
        SubscriptionError::Gateway {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        SubscriptionError::Persistence(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        SubscriptionError::Internal(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            SubscriptionError::Validation { .. } => ErrorCode::ValidationFailed,
            SubscriptionError::NotFound { resource, .. } => match *resource {
                "subscription_level" => ErrorCode::SubscriptionLevelNotFound,
                "promotion" => ErrorCode::PromotionNotFound,
                "user" => ErrorCode::UserNotFound,
                _ => ErrorCode::SubscriptionNotFound,
            },
            SubscriptionError::InvalidState { .. } => ErrorCode::InvalidStateTransition,
            SubscriptionError::Gateway { .. } => ErrorCode::PaymentGatewayError,
            SubscriptionError::Persistence(_) => ErrorCode::DatabaseError,
            SubscriptionError::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Returns a user-facing message.
    pub fn message(&self) -> String {
        match self {
            SubscriptionError::Validation { field, message } => {
                format!("Validation failed for '{}': {}", field, message)
            }
            SubscriptionError::NotFound { resource, id } => {
                format!("{} not found: {}", resource, id)
            }
            SubscriptionError::InvalidState { current, attempted } => {
                format!("Cannot {} subscription in {} state", attempted, current)
            }
            SubscriptionError::Gateway { service, message } => {
                format!("{} unavailable: {}", service, message)
            }
            SubscriptionError::Persistence(msg) => format!("Storage error: {}", msg),
            SubscriptionError::Internal(msg) => format!("Error: {}", msg),
        }
    }

    /// Returns true if the same call may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SubscriptionError::Gateway { .. } | SubscriptionError::Persistence(_)
        )
    }
}

impl std::fmt::Display for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for SubscriptionError {}

impl From<ValidationError> for SubscriptionError {
    fn from(err: ValidationError) -> Self {
        SubscriptionError::validation(err.field().to_string(), err.to_string())
    }
}

impl From<DomainError> for SubscriptionError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed | ErrorCode::InvalidPromotion | ErrorCode::InvalidWebhook => {
                let field = err.details.get("field").cloned().unwrap_or_default();
                SubscriptionError::validation(field, err.message)
            }
            ErrorCode::SubscriptionNotFound => {
                SubscriptionError::not_found("subscription", err.message)
            }
            ErrorCode::SubscriptionLevelNotFound => {
                SubscriptionError::not_found("subscription_level", err.message)
            }
            ErrorCode::PromotionNotFound => SubscriptionError::not_found("promotion", err.message),
            ErrorCode::UserNotFound => SubscriptionError::not_found("user", err.message),
            ErrorCode::InvalidStateTransition => SubscriptionError::InvalidState {
                current: err.details.get("current").cloned().unwrap_or_default(),
                attempted: err.message,
            },
            ErrorCode::PaymentGatewayError => SubscriptionError::gateway("payment", err.message),
            ErrorCode::NotificationError => {
                SubscriptionError::gateway("notification", err.message)
            }
            ErrorCode::SyncEndpointError => SubscriptionError::gateway("sync", err.message),
            ErrorCode::DatabaseError => SubscriptionError::Persistence(err.message),
            ErrorCode::InternalError => SubscriptionError::Internal(err.message),
        }
    }
}
