//! Tracing initialization with configurable logging formats.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{LogFormat, LoggingConfig};

/// Errors raised during tracing initialization.
#[derive(Debug, thiserror::Error)]
pub enum TracingError {
    #[error("invalid log filter '{filter}': {source}")]
    InvalidFilter {
        filter: String,
        source: tracing_subscriber::filter::ParseError,
    },
}

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. The output format
/// (pretty, compact, or JSON) comes from `[observability.logging]`.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TracingError> {
    let filter = build_env_filter(config)?;

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .pretty()
                .with_target(true)
                .with_thread_ids(false);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer().compact().with_target(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true);
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt_layer)
                .init();
        }
    }

    Ok(())
}

fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, TracingError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => filter_from_level(&config.level),
    }
}

fn filter_from_level(level: &str) -> Result<EnvFilter, TracingError> {
    EnvFilter::try_new(level).map_err(|source| TracingError::InvalidFilter {
        filter: level.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_builds_a_filter() {
        assert!(filter_from_level(&LoggingConfig::default().level).is_ok());
    }

    #[test]
    fn module_scoped_filter_is_accepted() {
        assert!(filter_from_level("ecometer=debug,tower_http=info").is_ok());
    }

    #[test]
    fn invalid_filter_is_an_error() {
        assert!(filter_from_level("not[a]filter=nope=nope").is_err());
    }
}
