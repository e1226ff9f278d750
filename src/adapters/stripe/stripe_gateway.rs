//! Stripe REST implementation of `PaymentGateway`.
//!
//! All calls are form-encoded POSTs authenticated with the secret key as the
//! basic-auth user. Deadlines are applied by the caller.

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::domain::foundation::Timestamp;
use crate::ports::{GatewayError, GatewayErrorCode, PaymentGateway, ProviderSubscription};

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    api_base_url: String,
}

impl StripeConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_key,
            api_base_url: DEFAULT_STRIPE_API_BASE.to_string(),
        }
    }

    /// Points the client at another host, e.g. stripe-mock.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }
}

/// Any Stripe object; only the ID is read back.
#[derive(Debug, Deserialize)]
struct StripeObjectRef {
    id: String,
}

/// Subscription response with `latest_invoice` expanded.
#[derive(Debug, Deserialize)]
struct StripeSubscriptionObject {
    id: String,
    #[serde(default)]
    latest_invoice: Option<StripeLatestInvoice>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StripeLatestInvoice {
    Expanded {
        #[serde(default)]
        charge: Option<String>,
        #[serde(default)]
        payment_intent: Option<String>,
    },
    Id(String),
}

impl From<StripeSubscriptionObject> for ProviderSubscription {
    fn from(object: StripeSubscriptionObject) -> Self {
        let latest_charge_ref = match object.latest_invoice {
            Some(StripeLatestInvoice::Expanded {
                charge,
                payment_intent,
            }) => charge.or(payment_intent),
            Some(StripeLatestInvoice::Id(_)) | None => None,
        };
        Self {
            subscription_ref: object.id,
            latest_charge_ref,
        }
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    code: Option<String>,
    message: Option<String>,
}

pub struct StripePaymentGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripePaymentGateway {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let url = format!("{}{}", self.config.api_base_url, path);

        let response = self
            .http_client
            .post(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params)
            .send()
            .await
            .map_err(|e| GatewayError::network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(path, status = status.as_u16(), "Stripe request failed");
            return Err(error_from_response(status, &body));
        }

        response.json().await.map_err(|e| {
            GatewayError::provider(format!("Failed to parse Stripe response: {}", e))
        })
    }

    async fn post_for_id(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<String, GatewayError> {
        let object: StripeObjectRef = self.post(path, params).await?;
        Ok(object.id)
    }

    async fn post_subscription(
        &self,
        params: &[(&str, String)],
    ) -> Result<ProviderSubscription, GatewayError> {
        let object: StripeSubscriptionObject = self.post("/v1/subscriptions", params).await?;
        Ok(object.into())
    }
}

/// Maps a non-2xx Stripe response to a gateway error.
fn error_from_response(status: StatusCode, body: &str) -> GatewayError {
    let detail = serde_json::from_str::<StripeErrorBody>(body)
        .ok()
        .map(|b| b.error);
    let message = detail
        .as_ref()
        .and_then(|d| d.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({})", status.as_u16()));

    let code = match status {
        StatusCode::PAYMENT_REQUIRED => GatewayErrorCode::CardDeclined,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => GatewayErrorCode::AuthenticationError,
        StatusCode::NOT_FOUND => GatewayErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => GatewayErrorCode::RateLimitExceeded,
        s if s.is_server_error() => GatewayErrorCode::NetworkError,
        _ => GatewayErrorCode::ProviderError,
    };

    let error = GatewayError::new(code, message);
    match detail.and_then(|d| d.code) {
        Some(provider_code) => error.with_provider_code(provider_code),
        None => error,
    }
}

fn subscription_params(customer_ref: &str, price_ref: &str) -> Vec<(&'static str, String)> {
    vec![
        ("customer", customer_ref.to_string()),
        ("items[0][price]", price_ref.to_string()),
        ("expand[]", "latest_invoice".to_string()),
    ]
}

fn refund_params(charge_ref: &str, reason: &str) -> Vec<(&'static str, String)> {
    let target = if charge_ref.starts_with("pi_") {
        "payment_intent"
    } else {
        "charge"
    };
    vec![
        (target, charge_ref.to_string()),
        ("metadata[reason]", reason.to_string()),
    ]
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    async fn create_subscription(
        &self,
        customer_ref: &str,
        price_ref: &str,
    ) -> Result<ProviderSubscription, GatewayError> {
        self.post_subscription(&subscription_params(customer_ref, price_ref))
            .await
    }

    async fn create_subscription_with_trial(
        &self,
        customer_ref: &str,
        price_ref: &str,
        trial_end: Timestamp,
    ) -> Result<ProviderSubscription, GatewayError> {
        let mut params = subscription_params(customer_ref, price_ref);
        params.push(("trial_end", trial_end.as_datetime().timestamp().to_string()));
        self.post_subscription(&params).await
    }

    async fn charge(
        &self,
        customer_ref: &str,
        amount_cents: i64,
        currency: &str,
        description: &str,
    ) -> Result<String, GatewayError> {
        let params = vec![
            ("customer", customer_ref.to_string()),
            ("amount", amount_cents.to_string()),
            ("currency", currency.to_lowercase()),
            ("description", description.to_string()),
        ];
        self.post_for_id("/v1/charges", &params).await
    }

    async fn refund(&self, charge_ref: &str, reason: &str) -> Result<String, GatewayError> {
        self.post_for_id("/v1/refunds", &refund_params(charge_ref, reason))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_defaults_and_trims() {
        let config = StripeConfig::new(SecretString::new("sk_test".to_string()));
        assert_eq!(config.api_base_url(), DEFAULT_STRIPE_API_BASE);

        let config = config.with_base_url("http://localhost:12111/");
        assert_eq!(config.api_base_url(), "http://localhost:12111");
    }

    #[test]
    fn card_errors_map_to_card_declined_with_provider_code() {
        let body = r#"{"error": {"type": "card_error", "code": "card_declined", "message": "Your card was declined."}}"#;
        let err = error_from_response(StatusCode::PAYMENT_REQUIRED, body);

        assert_eq!(err.code, GatewayErrorCode::CardDeclined);
        assert_eq!(err.message, "Your card was declined.");
        assert_eq!(err.provider_code.as_deref(), Some("card_declined"));
    }

    #[test]
    fn status_codes_map_to_gateway_codes() {
        let cases = [
            (StatusCode::UNAUTHORIZED, GatewayErrorCode::AuthenticationError),
            (StatusCode::NOT_FOUND, GatewayErrorCode::NotFound),
            (StatusCode::TOO_MANY_REQUESTS, GatewayErrorCode::RateLimitExceeded),
            (StatusCode::BAD_GATEWAY, GatewayErrorCode::NetworkError),
            (StatusCode::BAD_REQUEST, GatewayErrorCode::ProviderError),
        ];
        for (status, expected) in cases {
            assert_eq!(error_from_response(status, "").code, expected, "{}", status);
        }
    }

    #[test]
    fn unparseable_error_body_keeps_status_in_message() {
        let err = error_from_response(StatusCode::INTERNAL_SERVER_ERROR, "<html>");
        assert!(err.message.contains("500"));
        assert!(err.provider_code.is_none());
    }

    #[test]
    fn refund_targets_payment_intents_and_charges() {
        let params = refund_params("pi_123", "duplicate");
        assert_eq!(params[0], ("payment_intent", "pi_123".to_string()));
        assert_eq!(params[1], ("metadata[reason]", "duplicate".to_string()));

        let params = refund_params("ch_123", "requested");
        assert_eq!(params[0].0, "charge");
    }

    #[test]
    fn subscription_response_yields_first_charge() {
        let json = r#"{"id": "sub_1", "latest_invoice": {"id": "in_1", "charge": "ch_1", "payment_intent": "pi_1"}}"#;
        let object: StripeSubscriptionObject = serde_json::from_str(json).unwrap();
        let created = ProviderSubscription::from(object);

        assert_eq!(created.subscription_ref, "sub_1");
        assert_eq!(created.latest_charge_ref.as_deref(), Some("ch_1"));
    }

    #[test]
    fn payment_intent_stands_in_for_missing_charge() {
        let json = r#"{"id": "sub_2", "latest_invoice": {"id": "in_2", "charge": null, "payment_intent": "pi_2"}}"#;
        let object: StripeSubscriptionObject = serde_json::from_str(json).unwrap();
        assert_eq!(
            ProviderSubscription::from(object).latest_charge_ref.as_deref(),
            Some("pi_2")
        );
    }

    #[test]
    fn unexpanded_or_trial_invoice_has_no_charge() {
        let unexpanded: StripeSubscriptionObject =
            serde_json::from_str(r#"{"id": "sub_3", "latest_invoice": "in_3"}"#).unwrap();
        assert!(ProviderSubscription::from(unexpanded).latest_charge_ref.is_none());

        let trial: StripeSubscriptionObject = serde_json::from_str(
            r#"{"id": "sub_4", "latest_invoice": {"id": "in_4", "charge": null, "payment_intent": null}}"#,
        )
        .unwrap();
        assert!(ProviderSubscription::from(trial).latest_charge_ref.is_none());
    }

    #[tokio::test]
    async fn unreachable_host_is_a_network_error() {
        let gateway = StripePaymentGateway::new(
            StripeConfig::new(SecretString::new("sk_test".to_string()))
                .with_base_url("http://127.0.0.1:1"),
        );

        let err = gateway.charge("cus_1", 999, "USD", "test").await.unwrap_err();

        assert_eq!(err.code, GatewayErrorCode::NetworkError);
        assert!(err.is_retryable());
    }
}
