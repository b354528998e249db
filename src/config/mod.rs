//! Configuration module for the webhook service.
//!
//! The service is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [auth]
//! require_api_key = true
//! api_key = "${API_KEY}"
//!
//! [registry]
//! cache_ttl_secs = 3600
//! ```

mod auth;
mod limits;
mod observability;
mod registry;
mod server;

use std::path::Path;

pub use auth::*;
pub use limits::*;
pub use observability::*;
pub use registry::*;
use serde::{Deserialize, Serialize};
pub use server::*;

/// Root configuration for the webhook service.
///
/// All sections are optional with sensible defaults, allowing a fully
/// empty configuration file for local development.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EcometerConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Authentication configuration.
    #[serde(default)]
    pub auth: AuthConfig,

    /// Rate limiting configuration.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Model registry and name-resolution configuration.
    #[serde(default)]
    pub registry: RegistryConfig,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl EcometerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing required variables will cause an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: Self = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.registry.min_match_confidence) {
            return Err(ConfigError::Validation(
                "registry.min_match_confidence must be between 0.0 and 1.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.registry.min_search_score) {
            return Err(ConfigError::Validation(
                "registry.min_search_score must be between 0.0 and 1.0".into(),
            ));
        }

        if self.limits.enabled && self.limits.requests_per_minute == 0 {
            return Err(ConfigError::Validation(
                "limits.requests_per_minute must be greater than zero when rate \
                 limiting is enabled"
                    .into(),
            ));
        }

        if self.auth.require_api_key && self.auth.api_key.is_none() {
            tracing::warn!(
                "auth.require_api_key is enabled but no api_key is configured; \
                 requests will be rejected with 500 until one is set"
            );
        }

        if self.auth.webhook_signature.enabled && self.auth.webhook_signature.secret.is_none() {
            tracing::warn!(
                "auth.webhook_signature is enabled but no secret is configured; \
                 requests will be rejected with 500 until one is set"
            );
        }

        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand environment variables in the format `${VAR_NAME}`.
/// Variables appearing after a `#` comment marker are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let whole = cap.get(0).unwrap();

            // Skip if this variable is inside a comment
            if let Some(pos) = comment_pos {
                if whole.start() >= pos {
                    continue;
                }
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = EcometerConfig::from_str("").unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.limits.requests_per_minute, 60);
        assert_eq!(config.registry.cache_ttl_secs, 3600);
        assert!(!config.auth.require_api_key);
    }

    #[test]
    fn parses_full_config() {
        let config = EcometerConfig::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9000

            [auth]
            require_api_key = true
            api_key = "test-key"

            [limits]
            requests_per_minute = 10

            [registry]
            cache_ttl_secs = 60
            min_match_confidence = 0.7

            [observability.logging]
            level = "debug"
            format = "json"
        "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.auth.api_key.as_deref(), Some("test-key"));
        assert_eq!(config.limits.requests_per_minute, 10);
        assert_eq!(config.registry.cache_ttl_secs, 60);
        assert_eq!(config.registry.min_match_confidence, 0.7);
        assert_eq!(config.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(EcometerConfig::from_str("[server]\nbogus = 1").is_err());
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let err = EcometerConfig::from_str("[registry]\nmin_match_confidence = 1.5").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_zero_rate_limit() {
        let err = EcometerConfig::from_str("[limits]\nrequests_per_minute = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn env_var_expansion() {
        temp_env::with_var("ECOMETER_TEST_KEY", Some("sk-secret"), || {
            let result = expand_env_vars("api_key = \"${ECOMETER_TEST_KEY}\"").unwrap();
            assert_eq!(result, "api_key = \"sk-secret\"");
        });
    }

    #[test]
    fn env_var_in_comment_ignored() {
        let result = expand_env_vars("# api_key = \"${NONEXISTENT_VAR}\"").unwrap();
        assert_eq!(result, "# api_key = \"${NONEXISTENT_VAR}\"");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let err = expand_env_vars("key = \"${ECOMETER_DEFINITELY_UNSET}\"").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(_)));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecometer.toml");
        std::fs::write(&path, "[server]\nport = 8123\n").unwrap();

        let config = EcometerConfig::from_file(&path).unwrap();
        assert_eq!(config.server.port, 8123);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = EcometerConfig::from_file("/nonexistent/ecometer.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
