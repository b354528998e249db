//! Impact oracle contract.
//!
//! The oracle is the external capability that turns a canonical model name
//! plus token counts into energy (kWh) and global-warming-potential
//! (kgCO2eq) figures. The calculation pipeline treats it as a black box:
//! one synchronous in-process call per request, no retries, no timeouts.

mod profiles;

pub use profiles::{BUNDLED_PROFILES, ImpactProfile, ProfileOracle};

use thiserror::Error;

/// A model known to the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    /// Canonical model identifier, e.g. "gpt-4o".
    pub name: String,
    /// Provider tag as the oracle knows it, e.g. "openai".
    pub provider: String,
}

/// Energy and emission figures for a single inference call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEstimate {
    /// Electricity consumed, in kilowatt-hours.
    pub energy_kwh: f64,
    /// Global warming potential, in kilograms of CO2 equivalent.
    pub gwp_kgco2eq: f64,
}

/// Errors surfaced by an impact oracle.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The model name is not known to the oracle. Distinct from other
    /// failures so callers can report "not supported" instead of an
    /// internal error.
    #[error("model '{0}' not found")]
    ModelNotFound(String),

    /// The oracle itself failed (bad dataset, arithmetic problem, ...).
    #[error("impact estimation failed: {0}")]
    Estimation(String),
}

/// External estimation capability consumed by the calculation pipeline.
pub trait ImpactOracle: Send + Sync {
    /// List every model the oracle can estimate for.
    fn list_models(&self) -> Result<Vec<ModelDescriptor>, OracleError>;

    /// Whether the oracle recognizes `name` (case-insensitive).
    fn is_supported(&self, name: &str) -> bool;

    /// Estimate the impact of one call to `name` with the given token counts.
    ///
    /// Returns [`OracleError::ModelNotFound`] for unknown names.
    fn estimate(
        &self,
        name: &str,
        input_tokens: i64,
        output_tokens: i64,
    ) -> Result<ImpactEstimate, OracleError>;
}
