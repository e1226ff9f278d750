//! Feature flags configuration

use serde::Deserialize;

/// Feature flags for enabling/disabling functionality
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureFlags {
    /// Record daily subscription metrics
    #[serde(default = "enabled")]
    pub metrics_aggregation: bool,

    /// Emit logs as JSON lines instead of plain text
    #[serde(default = "enabled")]
    pub json_logs: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            metrics_aggregation: true,
            json_logs: true,
        }
    }
}

fn enabled() -> bool {
    true
}
