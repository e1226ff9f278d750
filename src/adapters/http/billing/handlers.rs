//! HTTP handlers for webhook ingestion and health.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::application::handlers::{HandlePaymentWebhookCommand, HandlePaymentWebhookHandler};
use crate::domain::foundation::DomainError;
use crate::domain::subscription::SubscriptionError;

use super::dto::{ErrorResponse, HealthResponse, WebhookAckResponse};

pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

/// Shared state for the billing routes.
#[derive(Clone)]
pub struct BillingAppState {
    pub webhook_handler: Arc<HandlePaymentWebhookHandler>,
}

/// POST /webhooks/stripe - Verified payment callbacks
pub async fn handle_stripe_webhook(
    State(state): State<BillingAppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, SubscriptionApiError> {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            SubscriptionError::validation(STRIPE_SIGNATURE_HEADER, "Missing Stripe-Signature header")
        })?;

    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };
    let outcome = state.webhook_handler.handle(cmd).await?;

    Ok((StatusCode::OK, Json(WebhookAckResponse::from(outcome))))
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::ok())
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts subscription errors to HTTP responses.
#[derive(Debug)]
pub struct SubscriptionApiError(SubscriptionError);

impl From<SubscriptionError> for SubscriptionApiError {
    fn from(err: SubscriptionError) -> Self {
        Self(err)
    }
}

impl From<DomainError> for SubscriptionApiError {
    fn from(err: DomainError) -> Self {
        Self(SubscriptionError::from(err))
    }
}

impl IntoResponse for SubscriptionApiError {
    fn into_response(self) -> axum::response::Response {
        let code = self.0.code().to_string();
        let (status, message) = match &self.0 {
            SubscriptionError::Validation { .. } => (StatusCode::BAD_REQUEST, self.0.message()),
            SubscriptionError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.message()),
            SubscriptionError::InvalidState { .. } => (StatusCode::CONFLICT, self.0.message()),
            SubscriptionError::Gateway { .. } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "A downstream service is unavailable, try again later".to_string(),
            ),
            SubscriptionError::Persistence(_) | SubscriptionError::Internal(_) => {
                tracing::error!(error = %self.0, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}
