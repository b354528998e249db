//! Impact calculation orchestration.
//!
//! Resolves the caller's model name to a canonical one, checks oracle
//! support, and invokes the oracle. Every calculation-domain failure is
//! contained here and converted into a typed [`CalculationResult`];
//! internal error details never reach the caller.

use std::{collections::HashMap, sync::Arc};

use thiserror::Error;

use crate::{
    config::RegistryConfig,
    models::{CalculationResult, validators},
    normalize::normalize,
    oracle::{ImpactEstimate, ImpactOracle, OracleError},
    registry::ModelRegistry,
};

/// Error message for negative token counts.
pub const NEGATIVE_TOKENS_ERROR: &str = "Token counts must be non-negative";

/// Safe message returned for any internal calculation failure.
pub const INTERNAL_CALCULATION_ERROR: &str = "Internal calculation error";

#[derive(Debug, Error)]
enum CalculationError {
    #[error("model '{0}' not supported")]
    Unsupported(String),

    #[error("resolved model name is invalid: {0}")]
    InvalidResolvedName(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),
}

/// Service computing energy/emission figures for one inference call.
pub struct CalculationService {
    oracle: Arc<dyn ImpactOracle>,
    registry: Option<Arc<ModelRegistry>>,
    static_mappings: HashMap<String, String>,
    min_match_confidence: f64,
}

impl CalculationService {
    pub fn new(
        oracle: Arc<dyn ImpactOracle>,
        registry: Option<Arc<ModelRegistry>>,
        config: &RegistryConfig,
    ) -> Self {
        Self {
            oracle,
            registry,
            static_mappings: config.model_mappings.clone(),
            min_match_confidence: config.min_match_confidence,
        }
    }

    /// Calculate the impact of one call. Never panics and never propagates
    /// an error: every failure becomes a `CalculationResult` with
    /// `success = false` and zeroed figures.
    pub fn calculate(
        &self,
        model: &str,
        input_tokens: i64,
        output_tokens: i64,
    ) -> CalculationResult {
        if input_tokens < 0 || output_tokens < 0 {
            return CalculationResult::error_result(NEGATIVE_TOKENS_ERROR);
        }

        match self.resolve_and_estimate(model, input_tokens, output_tokens) {
            Ok((estimate, resolved)) => {
                CalculationResult::success_result(estimate.energy_kwh, estimate.gwp_kgco2eq, resolved)
            }
            Err(CalculationError::Unsupported(name)) => {
                CalculationResult::error_result(format!("Model '{name}' not supported"))
            }
            Err(error) => {
                tracing::error!(model, %error, "calculation failed");
                CalculationResult::error_result(INTERNAL_CALCULATION_ERROR)
            }
        }
    }

    fn resolve_and_estimate(
        &self,
        model: &str,
        input_tokens: i64,
        output_tokens: i64,
    ) -> Result<(ImpactEstimate, String), CalculationError> {
        let resolved = self.resolve_model(model);

        // Mandatory even though the inbound request was already validated:
        // a mapping table can reintroduce disallowed characters.
        validators::validate_model_name(&resolved).map_err(|err| {
            CalculationError::InvalidResolvedName(
                err.message
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| err.code.to_string()),
            )
        })?;

        if !self.oracle.is_supported(&resolved) {
            return Err(CalculationError::Unsupported(resolved));
        }

        let estimate = self.oracle.estimate(&resolved, input_tokens, output_tokens)?;
        Ok((estimate, resolved))
    }

    /// Resolve the caller's model name to a canonical one.
    ///
    /// With a registry: accept its best match at or above the confidence
    /// floor, otherwise keep the raw input. Without one: run the typo
    /// normalizer and the static mapping table.
    fn resolve_model(&self, model: &str) -> String {
        match &self.registry {
            Some(registry) => match registry.find_best_match(model) {
                Some(matched) if matched.confidence >= self.min_match_confidence => {
                    tracing::debug!(
                        model,
                        matched = %matched.matched_name,
                        match_type = %matched.match_type,
                        confidence = matched.confidence,
                        "resolved model via registry"
                    );
                    matched.matched_name
                }
                _ => {
                    tracing::warn!(model, "no suitable registry match, using raw input");
                    model.to_string()
                }
            },
            None => {
                let normalized = normalize(model);
                self.static_mappings
                    .get(&normalized.to_lowercase())
                    .cloned()
                    .unwrap_or(normalized)
            }
        }
    }
}
