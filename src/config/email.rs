//! Email configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;

/// Email configuration (Resend)
#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    /// Resend API key; without it notifications are only logged
    pub resend_api_key: Option<SecretString>,

    /// From email address
    #[serde(default = "default_from_email")]
    pub from_email: String,

    /// From name
    #[serde(default = "default_from_name")]
    pub from_name: String,

    /// Operations recipients for delivery-failure alerts (comma-separated in env)
    #[serde(default, deserialize_with = "comma_separated")]
    pub admin_emails: Vec<String>,
}

impl EmailConfig {
    /// Validate email configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(key) = &self.resend_api_key {
            if !key.expose_secret().starts_with("re_") {
                return Err(ValidationError::InvalidResendKey);
            }
        }
        if !self.from_email.contains('@') {
            return Err(ValidationError::InvalidEmail(self.from_email.clone()));
        }
        if let Some(bad) = self.admin_emails.iter().find(|e| !e.contains('@')) {
            return Err(ValidationError::InvalidEmail(bad.clone()));
        }
        Ok(())
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            resend_api_key: None,
            from_email: default_from_email(),
            from_name: default_from_name(),
            admin_emails: Vec::new(),
        }
    }
}

fn default_from_email() -> String {
    "billing@videoflix.example".to_string()
}

fn default_from_name() -> String {
    "Videoflix".to_string()
}

/// Accepts either a list or a single comma-separated string.
fn comma_separated<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        List(Vec<String>),
        Joined(String),
    }

    let values = match Raw::deserialize(deserializer)? {
        Raw::List(values) => values,
        Raw::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };
    Ok(values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect())
}
