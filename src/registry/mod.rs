//! Thread-safe model registry with discovery, alias, and fuzzy matching.
//!
//! The registry keeps a time-bounded cache of the models the impact oracle
//! knows about and resolves arbitrary user input against it. The cache is
//! the only shared mutable state in the service: refreshes build a complete
//! new snapshot and swap it in atomically, so concurrent readers always see
//! a consistent map. A failed refresh serves the previous snapshot instead
//! of erroring (or an empty map when none exists yet).

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::{Arc, LazyLock},
    time::{Duration, Instant},
};

use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;

use crate::{config::RegistryConfig, oracle::ImpactOracle};

/// Snapshot of discovered models, keyed by canonical name.
pub type ModelMap = BTreeMap<String, ModelInfo>;

/// Provider of a model, derived from the oracle tag or name heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    OpenAi,
    Anthropic,
    Google,
    Cohere,
    Mistral,
    Unknown,
}

impl Provider {
    /// Parse an oracle-supplied provider tag.
    pub fn parse(tag: &str) -> Self {
        match tag.to_lowercase().as_str() {
            "openai" => Self::OpenAi,
            "anthropic" => Self::Anthropic,
            "google" => Self::Google,
            "cohere" => Self::Cohere,
            "mistral" => Self::Mistral,
            _ => Self::Unknown,
        }
    }

    /// Derive the provider from model name prefixes.
    pub fn from_model_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if ["gpt", "davinci", "curie", "babbage", "ada"]
            .iter()
            .any(|prefix| name.starts_with(prefix))
        {
            Self::OpenAi
        } else if name.starts_with("claude") {
            Self::Anthropic
        } else if ["gemini", "palm", "bison"]
            .iter()
            .any(|prefix| name.starts_with(prefix))
        {
            Self::Google
        } else if ["command", "embed"]
            .iter()
            .any(|prefix| name.starts_with(prefix))
        {
            Self::Cohere
        } else if ["mistral", "mixtral"]
            .iter()
            .any(|prefix| name.starts_with(prefix))
        {
            Self::Mistral
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Google => "google",
            Self::Cohere => "cohere",
            Self::Mistral => "mistral",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Information about a discovered model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub provider: Provider,
    pub available: bool,
    pub aliases: Vec<String>,
}

/// How a model match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    Exact,
    Alias,
    Transform,
    Fuzzy,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            Self::Exact => "exact",
            Self::Alias => "alias",
            Self::Transform => "transform",
            Self::Fuzzy => "fuzzy",
        };
        f.write_str(kind)
    }
}

/// Result of resolving user input against the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMatch {
    pub matched_name: String,
    pub original_name: String,
    /// Certainty of the match, in [0, 1].
    pub confidence: f64,
    pub match_type: MatchKind,
}

/// Common user input variations → standard names, checked before fuzzy
/// matching and re-verified against the discovered names.
static COMMON_TRANSFORMS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("gpt4o", "gpt-4o"),
        ("gpt4o-mini", "gpt-4o-mini"),
        ("gpt35-turbo", "gpt-3.5-turbo"),
        ("gpt-35-turbo", "gpt-3.5-turbo"),
        ("claude3-opus", "claude-3-opus"),
        ("claude3-sonnet", "claude-3-sonnet"),
        ("claude3-haiku", "claude-3-haiku"),
        ("claude35-sonnet", "claude-3-5-sonnet"),
    ])
});

/// Embedded dates like `-20240229` or `2024-02-29`.
static DATE_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d{4}-?\d{2}-?\d{2}").unwrap());

/// Trailing version numbers like `-001` or `-0125`.
static TRAILING_VERSION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d{3,4}$").unwrap());

struct CacheState {
    models: Arc<ModelMap>,
    refreshed_at: Option<Instant>,
}

/// Registry of models discoverable from the impact oracle.
pub struct ModelRegistry {
    oracle: Arc<dyn ImpactOracle>,
    ttl: Duration,
    min_match_confidence: f64,
    min_search_score: f64,
    cache: RwLock<CacheState>,
}

impl ModelRegistry {
    pub fn new(oracle: Arc<dyn ImpactOracle>, config: &RegistryConfig) -> Self {
        Self {
            oracle,
            ttl: Duration::from_secs(config.cache_ttl_secs),
            min_match_confidence: config.min_match_confidence,
            min_search_score: config.min_search_score,
            cache: RwLock::new(CacheState {
                models: Arc::new(ModelMap::new()),
                refreshed_at: None,
            }),
        }
    }

    /// Return the discovered model map, refreshing it from the oracle when
    /// the cache is stale, empty, or `force_refresh` is set.
    ///
    /// Never fails: if the oracle errors, the previous snapshot is served
    /// (or an empty map when no snapshot exists yet).
    pub fn discover(&self, force_refresh: bool) -> Arc<ModelMap> {
        if !force_refresh {
            let state = self.cache.read();
            let fresh = state
                .refreshed_at
                .is_some_and(|refreshed| refreshed.elapsed() < self.ttl);
            if fresh && !state.models.is_empty() {
                return state.models.clone();
            }
        }

        match self.oracle.list_models() {
            Ok(descriptors) => {
                let mut models = ModelMap::new();
                for descriptor in descriptors {
                    let provider = match Provider::parse(&descriptor.provider) {
                        Provider::Unknown => Provider::from_model_name(&descriptor.name),
                        provider => provider,
                    };
                    models.insert(
                        descriptor.name.clone(),
                        ModelInfo {
                            aliases: generate_aliases(&descriptor.name),
                            name: descriptor.name,
                            provider,
                            available: true,
                        },
                    );
                }

                let models = Arc::new(models);
                let mut state = self.cache.write();
                state.models = models.clone();
                state.refreshed_at = Some(Instant::now());
                drop(state);

                tracing::info!(count = models.len(), "discovered models from oracle");
                models
            }
            Err(error) => {
                tracing::error!(%error, "model discovery failed, serving cached models");
                self.cache.read().models.clone()
            }
        }
    }

    /// Force a cache refresh and return the new snapshot.
    pub fn refresh(&self) -> Arc<ModelMap> {
        self.discover(true)
    }

    /// Find the best matching model for arbitrary user input.
    ///
    /// Stages, in order: case-insensitive exact match (1.0), alias match
    /// (0.95), common-transform lookup re-verified against known names
    /// (0.9), similarity-ratio fuzzy match (accepted at or above the
    /// configured confidence floor). Ties go to the first candidate in the
    /// map's lexicographic iteration order.
    pub fn find_best_match(&self, user_input: &str) -> Option<ModelMatch> {
        let models = self.discover(false);
        if models.is_empty() {
            return None;
        }

        let needle = user_input.trim().to_lowercase();

        for name in models.keys() {
            if name.eq_ignore_ascii_case(&needle) {
                return Some(ModelMatch {
                    matched_name: name.clone(),
                    original_name: user_input.to_string(),
                    confidence: 1.0,
                    match_type: MatchKind::Exact,
                });
            }
        }

        for (name, info) in models.iter() {
            if info
                .aliases
                .iter()
                .any(|alias| alias.eq_ignore_ascii_case(&needle))
            {
                return Some(ModelMatch {
                    matched_name: name.clone(),
                    original_name: user_input.to_string(),
                    confidence: 0.95,
                    match_type: MatchKind::Alias,
                });
            }
        }

        if let Some(transformed) = COMMON_TRANSFORMS.get(needle.as_str()) {
            if let Some(name) = models
                .keys()
                .find(|name| name.eq_ignore_ascii_case(transformed))
            {
                return Some(ModelMatch {
                    matched_name: name.clone(),
                    original_name: user_input.to_string(),
                    confidence: 0.9,
                    match_type: MatchKind::Transform,
                });
            }
        }

        let mut best: Option<(&String, f64)> = None;
        for name in models.keys() {
            let score = similarity(&needle, &name.to_lowercase());
            if score >= self.min_match_confidence
                && best.is_none_or(|(_, best_score)| score > best_score)
            {
                best = Some((name, score));
            }
        }

        best.map(|(name, score)| ModelMatch {
            matched_name: name.clone(),
            original_name: user_input.to_string(),
            confidence: score,
            match_type: MatchKind::Fuzzy,
        })
    }

    /// All discovered model names, alphabetically sorted.
    pub fn supported_models(&self) -> Vec<String> {
        self.discover(false).keys().cloned().collect()
    }

    /// Discovered models grouped by provider, each list sorted.
    pub fn models_by_provider(&self) -> BTreeMap<Provider, Vec<String>> {
        let mut by_provider: BTreeMap<Provider, Vec<String>> = BTreeMap::new();
        for info in self.discover(false).values() {
            by_provider
                .entry(info.provider)
                .or_default()
                .push(info.name.clone());
        }
        // BTreeMap iteration is already sorted by name
        by_provider
    }

    /// Search for models matching `query`, best matches first.
    ///
    /// An empty query lists the first `limit` names alphabetically at score
    /// 1.0. Substring hits are boosted ahead of pure similarity matches.
    pub fn search(&self, query: &str, limit: usize) -> Vec<(String, f64)> {
        let models = self.discover(false);
        let query = query.trim().to_lowercase();

        if query.is_empty() {
            return models
                .keys()
                .take(limit)
                .map(|name| (name.clone(), 1.0))
                .collect();
        }

        let mut matches: Vec<(String, f64)> = Vec::new();
        for name in models.keys() {
            let name_lower = name.to_lowercase();
            if name_lower.contains(&query) {
                let score = query.len() as f64 / name.len() as f64;
                matches.push((name.clone(), (score + 0.5).min(1.0)));
            } else {
                let score = similarity(&query, &name_lower);
                if score >= self.min_search_score {
                    matches.push((name.clone(), score));
                }
            }
        }

        matches.sort_by(|(name_a, score_a), (name_b, score_b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| name_a.cmp(name_b))
        });
        matches.truncate(limit);
        matches
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.cache.read();
        f.debug_struct("ModelRegistry")
            .field("model_count", &state.models.len())
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Character-level similarity ratio in [0, 1].
fn similarity(a: &str, b: &str) -> f64 {
    similar::TextDiff::from_chars(a, b).ratio() as f64
}

/// Generate lookup aliases for a discovered model name: the hyphen-stripped
/// form, the "turbo"-stripped form, and date/version-stripped forms.
fn generate_aliases(name: &str) -> Vec<String> {
    let mut aliases = Vec::new();

    let no_hyphens = name.replace('-', "");
    if no_hyphens != name {
        aliases.push(no_hyphens);
    }

    if name.contains("turbo") {
        let stripped = name.replace("turbo", "");
        let stripped = stripped.trim_end_matches('-').to_string();
        if !stripped.is_empty() && stripped != name {
            aliases.push(stripped);
        }
    }

    if name.chars().any(|c| c.is_ascii_digit()) {
        let base = DATE_FRAGMENT.replace_all(name, "");
        let base = TRAILING_VERSION.replace_all(&base, "").to_string();
        if !base.is_empty() && base != name && !aliases.contains(&base) {
            aliases.push(base);
        }
    }

    aliases
}
