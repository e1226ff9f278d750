//! Downstream synchronization configuration

use serde::Deserialize;

use super::error::ValidationError;

/// Endpoints that receive subscription changes
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub enabled: bool,

    /// CRM snapshot endpoint
    pub crm_url: Option<String>,

    /// Analytics snapshot endpoint
    pub analytics_url: Option<String>,

    /// Cancellation-reason endpoint
    pub cancellation_url: Option<String>,
}

impl SyncConfig {
    /// Validate sync configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_url("sync.crm_url", self.crm_url.as_deref())?;
        check_url("sync.analytics_url", self.analytics_url.as_deref())?;
        check_url("sync.cancellation_url", self.cancellation_url.as_deref())?;
        Ok(())
    }
}

fn check_url(field: &'static str, url: Option<&str>) -> Result<(), ValidationError> {
    match url {
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
            Err(ValidationError::InvalidUrl(field))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_disabled_by_default() {
        let config = SyncConfig::default();
        assert!(!config.enabled);
        assert!(config.crm_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_non_http_url_rejected() {
        let config = SyncConfig {
            analytics_url: Some("ftp://analytics".to_string()),
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(ValidationError::InvalidUrl("sync.analytics_url"))
        );
    }
}
