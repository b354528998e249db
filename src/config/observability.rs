use serde::{Deserialize, Serialize};

/// Observability configuration (logging).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ObservabilityConfig {
    /// Console logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Console logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default log filter when `RUST_LOG` is not set, e.g. "info" or
    /// "ecometer=debug,tower_http=info".
    #[serde(default = "default_level")]
    pub level: String,

    /// Console output format.
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// Console log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output.
    #[default]
    Pretty,
    /// Single-line output.
    Compact,
    /// Newline-delimited JSON for log shippers.
    Json,
}
