//! Model registry introspection endpoints.

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::{
    AppState,
    models::ApiError,
    registry::{MatchKind, Provider},
};

/// Search results are capped to this many entries.
const MAX_SEARCH_LIMIT: usize = 50;

/// Names are considered confidently valid at or above this score.
const VALIDATE_CONFIDENCE_FLOOR: f64 = 0.9;

/// Summary response for `GET /models`.
#[derive(Debug, Serialize)]
pub struct ModelsSummary {
    /// Names accepted by the static mapping table.
    pub supported_models: Vec<String>,
    /// Number of models the oracle can estimate for.
    pub total_oracle_models: usize,
}

/// Detailed response for `GET /models/supported`.
#[derive(Debug, Serialize)]
pub struct SupportedModelsResponse {
    pub models: Vec<String>,
    pub total_count: usize,
    pub by_provider: BTreeMap<Provider, Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: String,
    #[serde(default = "default_search_limit")]
    limit: usize,
}

fn default_search_limit() -> usize {
    10
}

/// One search hit.
#[derive(Debug, Serialize)]
pub struct ModelSearchResult {
    pub name: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub struct MatchParams {
    name: String,
}

/// Response for `GET /models/match`.
#[derive(Debug, Serialize)]
pub struct ModelMatchResult {
    pub matched_name: String,
    pub original_name: String,
    pub confidence: f64,
    pub match_type: MatchKind,
    pub available: bool,
}

/// Response for `POST /models/refresh`.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub message: &'static str,
    pub discovered_models: usize,
    /// First few names, for a quick visual check.
    pub models: Vec<String>,
}

/// Per-provider summary for `GET /models/providers`.
#[derive(Debug, Serialize)]
pub struct ProviderSummary {
    pub name: Provider,
    pub model_count: usize,
    pub models: Vec<String>,
}

/// Response for `GET /models/validate/{name}` when the name is valid.
#[derive(Debug, Serialize)]
pub struct ValidModelResponse {
    pub valid: bool,
    pub model_name: String,
    pub matched_name: String,
    pub confidence: f64,
    pub match_type: MatchKind,
}

/// Response for `GET /models/validate/{name}` when the name is not valid.
#[derive(Debug, Serialize)]
pub struct InvalidModelResponse {
    pub valid: bool,
    pub model_name: String,
    pub suggestions: Vec<ModelSearchResult>,
    pub message: String,
}

/// List the statically supported model names and the oracle model count.
pub async fn list_models(State(state): State<AppState>) -> Json<ModelsSummary> {
    let mut supported: Vec<String> = state.config.registry.model_mappings.keys().cloned().collect();
    supported.sort();

    let total = match &state.registry {
        Some(registry) => registry.discover(false).len(),
        None => state
            .oracle
            .list_models()
            .map(|models| models.len())
            .unwrap_or(0),
    };

    Json(ModelsSummary {
        supported_models: supported,
        total_oracle_models: total,
    })
}

/// List every model discoverable from the oracle, grouped by provider.
pub async fn supported_models(State(state): State<AppState>) -> Response {
    let Some(registry) = &state.registry else {
        return registry_disabled();
    };

    let models = registry.supported_models();
    let by_provider = registry.models_by_provider();

    Json(SupportedModelsResponse {
        total_count: models.len(),
        models,
        by_provider,
    })
    .into_response()
}

/// Search for models by name or partial name.
pub async fn search_models(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Response {
    let Some(registry) = &state.registry else {
        return registry_disabled();
    };

    let limit = params.limit.clamp(1, MAX_SEARCH_LIMIT);
    let results: Vec<ModelSearchResult> = registry
        .search(&params.q, limit)
        .into_iter()
        .map(|(name, confidence)| ModelSearchResult { name, confidence })
        .collect();

    Json(results).into_response()
}

/// Find the best matching model for a given name.
pub async fn match_model(
    State(state): State<AppState>,
    Query(params): Query<MatchParams>,
) -> Response {
    let Some(registry) = &state.registry else {
        return registry_disabled();
    };

    match registry.find_best_match(&params.name) {
        Some(matched) => Json(ModelMatchResult {
            matched_name: matched.matched_name,
            original_name: matched.original_name,
            confidence: matched.confidence,
            match_type: matched.match_type,
            available: true,
        })
        .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiError::new(format!(
                "No suitable model found for '{}'. Use /models/search to find similar models.",
                params.name
            ))),
        )
            .into_response(),
    }
}

/// Force a refresh of the model cache from the oracle.
pub async fn refresh_models(State(state): State<AppState>) -> Response {
    let Some(registry) = &state.registry else {
        return registry_disabled();
    };

    let models = registry.refresh();

    Json(RefreshResponse {
        message: "Model cache refreshed successfully",
        discovered_models: models.len(),
        models: models.keys().take(20).cloned().collect(),
    })
    .into_response()
}

/// Summarize discovered models per provider.
pub async fn providers(State(state): State<AppState>) -> Response {
    let Some(registry) = &state.registry else {
        return registry_disabled();
    };

    let summaries: BTreeMap<Provider, ProviderSummary> = registry
        .models_by_provider()
        .into_iter()
        .map(|(provider, models)| {
            (
                provider,
                ProviderSummary {
                    name: provider,
                    model_count: models.len(),
                    models,
                },
            )
        })
        .collect();

    Json(summaries).into_response()
}

/// Validate a model name, suggesting alternatives when it is not known.
pub async fn validate_model(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Response {
    let Some(registry) = &state.registry else {
        return registry_disabled();
    };

    match registry.find_best_match(&name) {
        Some(matched) if matched.confidence >= VALIDATE_CONFIDENCE_FLOOR => {
            Json(ValidModelResponse {
                valid: true,
                model_name: name,
                matched_name: matched.matched_name,
                confidence: matched.confidence,
                match_type: matched.match_type,
            })
            .into_response()
        }
        _ => {
            let suggestions: Vec<ModelSearchResult> = registry
                .search(&name, 5)
                .into_iter()
                .map(|(name, confidence)| ModelSearchResult { name, confidence })
                .collect();

            Json(InvalidModelResponse {
                valid: false,
                message: format!(
                    "Model '{name}' not found. Consider using one of the suggestions."
                ),
                model_name: name,
                suggestions,
            })
            .into_response()
        }
    }
}

fn registry_disabled() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiError::new("Model registry is disabled")),
    )
        .into_response()
}
