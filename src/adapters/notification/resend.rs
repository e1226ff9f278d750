//! Resend email adapter.
//!
//! Sends plain-text email through the Resend HTTP API. Push delivery is not
//! offered by Resend; push requests are logged and dropped.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use crate::domain::foundation::{DomainError, ErrorCode};
use crate::ports::NotificationGateway;

/// Resend API configuration.
#[derive(Clone)]
pub struct ResendConfig {
    api_key: SecretString,
    from: String,
    api_base_url: String,
}

impl ResendConfig {
    /// `from_name` and `from_address` combine into `"Name <address>"`.
    pub fn new(api_key: SecretString, from_address: &str, from_name: &str) -> Self {
        let from = if from_name.trim().is_empty() {
            from_address.to_string()
        } else {
            format!("{} <{}>", from_name, from_address)
        };
        Self {
            api_key,
            from,
            api_base_url: "https://api.resend.com".to_string(),
        }
    }

    /// Override the base URL (for testing with a local server).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn from(&self) -> &str {
        &self.from
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

pub struct ResendNotificationGateway {
    config: ResendConfig,
    http_client: reqwest::Client,
}

impl ResendNotificationGateway {
    pub fn new(config: ResendConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl NotificationGateway for ResendNotificationGateway {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), DomainError> {
        let request = SendEmailRequest {
            from: &self.config.from,
            to: [to],
            subject,
            text: body,
        };

        let response = self
            .http_client
            .post(format!("{}/emails", self.config.api_base_url))
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::new(ErrorCode::NotificationError, e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(DomainError::new(
                ErrorCode::NotificationError,
                format!("Resend responded {}: {}", status, error_text),
            ));
        }

        debug!(subject, "Email accepted by Resend");
        Ok(())
    }

    async fn send_push(&self, _token: &str, title: &str, _body: &str) -> Result<(), DomainError> {
        debug!(title, "Push delivery not configured, skipped");
        Ok(())
    }
}
