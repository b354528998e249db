use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Model registry and name-resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegistryConfig {
    /// Enable the dynamic model registry. When disabled, the calculation
    /// service falls back to the static `model_mappings` table.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds before the discovered model cache is considered stale.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Minimum similarity for a fuzzy match to be accepted during name
    /// resolution. Empirical tunable; raise it to reject looser matches.
    #[serde(default = "default_min_match_confidence")]
    pub min_match_confidence: f64,

    /// Minimum similarity for a model to appear in search results.
    #[serde(default = "default_min_search_score")]
    pub min_search_score: f64,

    /// Static versioned-name → canonical-name mappings, used when the
    /// registry is disabled. Overriding this table is also how deployments
    /// choose their own normalization policy (e.g. upgrading
    /// "claude-3-sonnet" to a newer revision).
    #[serde(default = "default_model_mappings")]
    pub model_mappings: HashMap<String, String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            cache_ttl_secs: default_cache_ttl_secs(),
            min_match_confidence: default_min_match_confidence(),
            min_search_score: default_min_search_score(),
            model_mappings: default_model_mappings(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_min_match_confidence() -> f64 {
    0.6
}

fn default_min_search_score() -> f64 {
    0.3
}

/// Default mappings from versioned/dated model names to the names the
/// impact oracle expects. Canonical names map to themselves.
pub fn default_model_mappings() -> HashMap<String, String> {
    [
        // OpenAI models
        ("gpt-4o-2024-05-13", "gpt-4o"),
        ("gpt4o-2024-05-13", "gpt-4o"),
        ("gpt-4o-mini-2024-07-18", "gpt-4o-mini"),
        ("gpt4o-mini-2024-07-18", "gpt-4o-mini"),
        ("gpt-3.5-turbo-0125", "gpt-3.5-turbo"),
        ("gpt-4-0613", "gpt-4"),
        // Anthropic models
        ("claude-3-opus-20240229", "claude-3-opus"),
        ("claude-3-sonnet-20240229", "claude-3-sonnet"),
        ("claude-3-haiku-20240307", "claude-3-haiku"),
        ("claude-3-5-sonnet-20240620", "claude-3-5-sonnet"),
        // Google models
        ("gemini-1.0-pro", "gemini-pro"),
        ("gemini-1.5-pro-001", "gemini-1.5-pro"),
        // Pass-through for already-canonical names
        ("gpt-4o", "gpt-4o"),
        ("gpt-4o-mini", "gpt-4o-mini"),
        ("gpt-3.5-turbo", "gpt-3.5-turbo"),
        ("gpt-4", "gpt-4"),
    ]
    .into_iter()
    .map(|(from, to)| (from.to_string(), to.to_string()))
    .collect()
}
