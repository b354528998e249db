use serde::{Deserialize, Serialize};

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LimitsConfig {
    /// Enable per-client-IP rate limiting.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Requests allowed per client IP per minute.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    60
}
