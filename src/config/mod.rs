//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables through the
//! `config` and `dotenvy` crates. Variables use the `VIDEOFLIX_BILLING`
//! prefix and `__` between nested keys.
//!
//! # Example
//!
//! ```no_run
//! use videoflix_billing::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod email;
mod error;
mod features;
mod payment;
mod scheduler;
mod server;
mod sync;

pub use database::DatabaseConfig;
pub use email::EmailConfig;
pub use error::{ConfigError, ValidationError};
pub use features::FeatureFlags;
pub use payment::PaymentConfig;
pub use scheduler::{JobHours, SchedulerConfig};
pub use server::{Environment, ServerConfig};
pub use sync::SyncConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Database configuration (PostgreSQL connection)
    pub database: DatabaseConfig,

    /// Payment configuration (Stripe)
    pub payment: PaymentConfig,

    /// Email configuration (Resend)
    #[serde(default)]
    pub email: EmailConfig,

    /// Reconciliation job settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Downstream synchronization
    #[serde(default)]
    pub sync: SyncConfig,

    /// Feature flags
    #[serde(default)]
    pub features: FeatureFlags,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `VIDEOFLIX_BILLING` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    ///
    /// # Environment Variable Format
    ///
    /// - `VIDEOFLIX_BILLING__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `VIDEOFLIX_BILLING__SCHEDULER__HOURS__CLEANUP=2` -> `scheduler.hours.cleanup = 2`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("VIDEOFLIX_BILLING")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for the first section that is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.database.validate()?;
        self.payment.validate()?;
        self.email.validate()?;
        self.scheduler.validate()?;
        self.sync.validate()?;
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::Mutex;

    // Env vars are process-global
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const MINIMAL: [(&str, &str); 3] = [
        ("VIDEOFLIX_BILLING__DATABASE__URL", "postgresql://test@localhost/test"),
        ("VIDEOFLIX_BILLING__PAYMENT__STRIPE_API_KEY", "sk_test_xxx"),
        ("VIDEOFLIX_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx"),
    ];

    const OPTIONAL: [&str; 4] = [
        "VIDEOFLIX_BILLING__SERVER__PORT",
        "VIDEOFLIX_BILLING__SERVER__ENVIRONMENT",
        "VIDEOFLIX_BILLING__SCHEDULER__BATCH_SIZE",
        "VIDEOFLIX_BILLING__SYNC__ENABLED",
    ];

    fn load_with(extra: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        for (key, value) in MINIMAL.iter().chain(extra) {
            env::set_var(key, value);
        }
        let result = AppConfig::load();
        for (key, _) in MINIMAL {
            env::remove_var(key);
        }
        for key in OPTIONAL {
            env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_load_from_environment() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let result = load_with(&[]);

        assert!(result.is_ok(), "Failed to load config: {:?}", result.err());
        let config = result.unwrap();
        assert_eq!(config.database.url, "postgresql://test@localhost/test");
        assert_eq!(config.payment.refund_window_days, 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_section_defaults() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[]).unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.environment, Environment::Development);
        assert_eq!(config.scheduler.batch_size, 100);
        assert!(!config.sync.enabled);
        assert!(config.features.metrics_aggregation);
    }

    #[test]
    fn test_nested_overrides() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let config = load_with(&[
            ("VIDEOFLIX_BILLING__SERVER__PORT", "3000"),
            ("VIDEOFLIX_BILLING__SERVER__ENVIRONMENT", "production"),
            ("VIDEOFLIX_BILLING__SCHEDULER__BATCH_SIZE", "25"),
            ("VIDEOFLIX_BILLING__SYNC__ENABLED", "true"),
        ])
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert!(config.is_production());
        assert_eq!(config.scheduler.batch_size, 25);
        assert!(config.sync.enabled);
    }

    #[test]
    fn test_missing_database_url_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        env::set_var("VIDEOFLIX_BILLING__PAYMENT__STRIPE_API_KEY", "sk_test_xxx");
        env::set_var("VIDEOFLIX_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET", "whsec_xxx");
        let result = AppConfig::load();
        env::remove_var("VIDEOFLIX_BILLING__PAYMENT__STRIPE_API_KEY");
        env::remove_var("VIDEOFLIX_BILLING__PAYMENT__STRIPE_WEBHOOK_SECRET");

        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
