//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Payment configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key
    pub stripe_api_key: SecretString,

    /// Stripe webhook signing secret
    pub stripe_webhook_secret: SecretString,

    /// Override for the Stripe API host (stripe-mock, proxies)
    pub stripe_api_base_url: Option<String>,

    /// Cancellations within this many days of the start are refunded
    #[serde(default = "default_refund_window_days")]
    pub refund_window_days: i64,
}

impl PaymentConfig {
    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let api_key = self.stripe_api_key.expose_secret();
        let webhook_secret = self.stripe_webhook_secret.expose_secret();
        if api_key.is_empty() {
            return Err(ValidationError::MissingRequired("payment.stripe_api_key"));
        }
        if webhook_secret.is_empty() {
            return Err(ValidationError::MissingRequired("payment.stripe_webhook_secret"));
        }

        // Verify key prefixes for safety
        if !api_key.starts_with("sk_") && !api_key.starts_with("rk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !webhook_secret.starts_with("whsec_") {
            return Err(ValidationError::InvalidStripeWebhookSecret);
        }
        if self.refund_window_days < 0 {
            return Err(ValidationError::MustBePositive("payment.refund_window_days"));
        }
        Ok(())
    }
}

fn default_refund_window_days() -> i64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: &str, webhook_secret: &str) -> PaymentConfig {
        PaymentConfig {
            stripe_api_key: SecretString::new(api_key.to_string()),
            stripe_webhook_secret: SecretString::new(webhook_secret.to_string()),
            stripe_api_base_url: None,
            refund_window_days: default_refund_window_days(),
        }
    }

    #[test]
    fn test_is_test_mode() {
        assert!(config("sk_test_xxx", "whsec_xxx").is_test_mode());
        assert!(!config("sk_live_xxx", "whsec_xxx").is_test_mode());
    }

    #[test]
    fn test_validation_missing_values() {
        assert_eq!(
            config("", "whsec_xxx").validate(),
            Err(ValidationError::MissingRequired("payment.stripe_api_key"))
        );
        assert_eq!(
            config("sk_test_xxx", "").validate(),
            Err(ValidationError::MissingRequired("payment.stripe_webhook_secret"))
        );
    }

    #[test]
    fn test_validation_invalid_prefixes() {
        assert_eq!(
            config("pk_test_xxx", "whsec_xxx").validate(),
            Err(ValidationError::InvalidStripeKey)
        );
        assert_eq!(
            config("sk_test_xxx", "secret_xxx").validate(),
            Err(ValidationError::InvalidStripeWebhookSecret)
        );
    }

    #[test]
    fn test_validation_valid_config() {
        let config = config("sk_test_abcd1234", "whsec_xyz789");
        assert!(config.validate().is_ok());
        assert_eq!(config.refund_window_days, 7);
    }

    #[test]
    fn test_secrets_are_redacted_in_debug() {
        let rendered = format!("{:?}", config("sk_test_abcd1234", "whsec_xyz789"));
        assert!(!rendered.contains("abcd1234"));
    }
}
