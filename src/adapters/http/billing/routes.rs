//! Axum router for the billing service.

use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{handle_stripe_webhook, health, BillingAppState};

/// Builds the service router.
///
/// # Routes
/// - `POST /webhooks/stripe` - Stripe callbacks (no auth, signature verified)
/// - `GET /health` - Liveness probe
pub fn billing_router(state: BillingAppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/webhooks/stripe", post(handle_stripe_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use secrecy::SecretString;
    use tower::ServiceExt;

    use super::super::handlers::STRIPE_SIGNATURE_HEADER;
    use crate::adapters::stripe::{sign_for_test, StripeWebhookVerifier};
    use crate::application::handlers::{
        HandlePaymentWebhookHandler, RecordPaymentFailureHandler, RecordPaymentSuccessHandler,
    };
    use crate::application::test_support::Fixture;
    use crate::domain::foundation::Timestamp;
    use crate::domain::subscription::SubscriptionStatus;

    const SECRET: &str = "whsec_router_test";

    fn router(fx: &Fixture) -> Router {
        let failure = Arc::new(RecordPaymentFailureHandler::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.events.clone(),
            fx.dispatcher(),
        ));
        let success = Arc::new(RecordPaymentSuccessHandler::new(
            fx.repo.clone(),
            fx.levels.clone(),
            fx.events.clone(),
            fx.dispatcher(),
        ));
        let verifier = Arc::new(StripeWebhookVerifier::new(SecretString::new(SECRET.to_string())));
        let state = BillingAppState {
            webhook_handler: Arc::new(HandlePaymentWebhookHandler::new(verifier, failure, success)),
        };
        billing_router(state, Duration::from_secs(5))
    }

    fn failure_payload(external_id: &str) -> String {
        serde_json::json!({
            "id": "evt_1",
            "type": "invoice.payment_failed",
            "created": 1704067200,
            "data": { "object": { "id": "in_1", "customer": "cus_1", "subscription": external_id } }
        })
        .to_string()
    }

    fn webhook_request(payload: String, signature: Option<String>) -> Request<Body> {
        let mut builder = Request::builder().method("POST").uri("/webhooks/stripe");
        if let Some(signature) = signature {
            builder = builder.header(STRIPE_SIGNATURE_HEADER, signature);
        }
        builder.body(Body::from(payload)).unwrap()
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let fx = Fixture::new().await;
        let response = router(&fx)
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn signed_failure_marks_subscription() {
        let fx = Fixture::new().await;
        let sub = fx.active_subscription(Timestamp::now());
        fx.store(&sub).await;
        let payload = failure_payload("sub_ext_1");
        let signature = sign_for_test(SECRET, &payload, Timestamp::now().as_datetime().timestamp());

        let response = router(&fx)
            .oneshot(webhook_request(payload, Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(fx.reload(&sub.id).await.status, SubscriptionStatus::PaymentFailed);
    }

    #[tokio::test]
    async fn missing_signature_is_bad_request() {
        let fx = Fixture::new().await;
        let response = router(&fx)
            .oneshot(webhook_request(failure_payload("sub_ext_1"), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn tampered_body_is_bad_request_and_changes_nothing() {
        let fx = Fixture::new().await;
        let sub = fx.active_subscription(Timestamp::now());
        fx.store(&sub).await;
        let signature = sign_for_test(
            SECRET,
            &failure_payload("sub_other"),
            Timestamp::now().as_datetime().timestamp(),
        );

        let response = router(&fx)
            .oneshot(webhook_request(failure_payload("sub_ext_1"), Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fx.reload(&sub.id).await.status, SubscriptionStatus::Active);
    }

    #[tokio::test]
    async fn unknown_subscription_is_acknowledged() {
        let fx = Fixture::new().await;
        let payload = failure_payload("sub_unknown");
        let signature = sign_for_test(SECRET, &payload, Timestamp::now().as_datetime().timestamp());

        let response = router(&fx)
            .oneshot(webhook_request(payload, Some(signature)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
