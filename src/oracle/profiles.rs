//! Profile-backed impact oracle.
//!
//! The production oracle: a table of per-model energy profiles shipped with
//! the binary and loaded at startup. Each profile carries per-1k-token
//! electricity rates and the grid carbon intensity used to convert energy
//! into emissions. The estimation formula is deliberately simple and lives
//! entirely behind the [`ImpactOracle`] trait; nothing outside this module
//! depends on it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ImpactEstimate, ImpactOracle, ModelDescriptor, OracleError};

/// The embedded impact profile dataset.
///
/// Loaded at compile time so the service works with zero external files.
pub const BUNDLED_PROFILES: &str = include_str!("../../data/impact-profiles.json");

/// Energy/emission profile for one model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactProfile {
    /// Canonical model identifier.
    pub name: String,

    /// Provider tag, e.g. "openai".
    pub provider: String,

    /// Electricity drawn per 1k prompt tokens (kWh).
    pub energy_kwh_per_1k_input: f64,

    /// Electricity drawn per 1k completion tokens (kWh).
    pub energy_kwh_per_1k_output: f64,

    /// Grid carbon intensity applied to the energy figure (kgCO2eq/kWh).
    pub gwp_kgco2eq_per_kwh: f64,
}

#[derive(Debug, Deserialize)]
struct ProfileFile {
    models: Vec<ImpactProfile>,
}

/// Impact oracle backed by a static profile table.
#[derive(Debug, Clone)]
pub struct ProfileOracle {
    /// Profiles keyed by lower-cased canonical name.
    profiles: HashMap<String, ImpactProfile>,
}

impl ProfileOracle {
    /// Load profiles from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: ProfileFile = serde_json::from_str(json)?;
        let profiles = file
            .models
            .into_iter()
            .map(|profile| (profile.name.to_lowercase(), profile))
            .collect();
        Ok(Self { profiles })
    }

    /// Load the bundled dataset.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED_PROFILES)
    }

    /// Number of models in the profile table.
    pub fn model_count(&self) -> usize {
        self.profiles.len()
    }
}

impl ImpactOracle for ProfileOracle {
    fn list_models(&self) -> Result<Vec<ModelDescriptor>, OracleError> {
        Ok(self
            .profiles
            .values()
            .map(|profile| ModelDescriptor {
                name: profile.name.clone(),
                provider: profile.provider.clone(),
            })
            .collect())
    }

    fn is_supported(&self, name: &str) -> bool {
        self.profiles.contains_key(&name.to_lowercase())
    }

    fn estimate(
        &self,
        name: &str,
        input_tokens: i64,
        output_tokens: i64,
    ) -> Result<ImpactEstimate, OracleError> {
        let profile = self
            .profiles
            .get(&name.to_lowercase())
            .ok_or_else(|| OracleError::ModelNotFound(name.to_string()))?;

        let energy_kwh = (input_tokens as f64 / 1000.0) * profile.energy_kwh_per_1k_input
            + (output_tokens as f64 / 1000.0) * profile.energy_kwh_per_1k_output;
        let gwp_kgco2eq = energy_kwh * profile.gwp_kgco2eq_per_kwh;

        Ok(ImpactEstimate {
            energy_kwh,
            gwp_kgco2eq,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_profiles_parse() {
        let oracle = ProfileOracle::bundled().expect("bundled profiles should be valid JSON");
        assert!(
            oracle.model_count() >= 20,
            "expected a reasonably sized dataset, got {}",
            oracle.model_count()
        );
    }

    #[test]
    fn bundled_profiles_cover_normalizer_targets() {
        // Every canonical name the normalizer can produce must be estimable,
        // otherwise a successfully normalized request would still fail.
        let oracle = ProfileOracle::bundled().unwrap();
        for name in [
            "gpt-4o",
            "gpt-4o-mini",
            "gpt-3.5-turbo",
            "gpt-4",
            "claude-3-opus",
            "claude-3-sonnet",
            "claude-3-haiku",
            "claude-3-5-sonnet",
            "gemini-pro",
            "gemini-1.5-pro",
        ] {
            assert!(oracle.is_supported(name), "missing profile for {name}");
        }
    }

    #[test]
    fn is_supported_is_case_insensitive() {
        let oracle = ProfileOracle::bundled().unwrap();
        assert!(oracle.is_supported("GPT-4o"));
        assert!(!oracle.is_supported("definitely-not-a-model-xyz"));
    }

    #[test]
    fn estimate_is_linear_in_tokens() {
        let oracle = ProfileOracle::from_json(
            r#"{
                "models": [
                    {
                        "name": "test-model",
                        "provider": "openai",
                        "energy_kwh_per_1k_input": 0.001,
                        "energy_kwh_per_1k_output": 0.002,
                        "gwp_kgco2eq_per_kwh": 0.5
                    }
                ]
            }"#,
        )
        .unwrap();

        let estimate = oracle.estimate("test-model", 1000, 500).unwrap();
        assert!((estimate.energy_kwh - 0.002).abs() < 1e-12);
        assert!((estimate.gwp_kgco2eq - 0.001).abs() < 1e-12);

        let zero = oracle.estimate("test-model", 0, 0).unwrap();
        assert_eq!(zero.energy_kwh, 0.0);
        assert_eq!(zero.gwp_kgco2eq, 0.0);
    }

    #[test]
    fn estimate_is_deterministic() {
        let oracle = ProfileOracle::bundled().unwrap();
        let first = oracle.estimate("gpt-4o", 1000, 500).unwrap();
        let second = oracle.estimate("gpt-4o", 1000, 500).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_model_is_a_distinct_error() {
        let oracle = ProfileOracle::bundled().unwrap();
        let err = oracle.estimate("definitely-not-a-model-xyz", 1, 1).unwrap_err();
        assert!(matches!(err, OracleError::ModelNotFound(_)));
    }
}
