//! Request, response, and domain value types for the calculation pipeline.

pub mod validators;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use validator::Validate;

use validators::{validate_metadata, validate_model_name};

/// Inbound usage report for one model inference call.
///
/// Constructed once per request, validated at the boundary, and discarded
/// after the response is built. The model name is trimmed and lower-cased
/// via [`UsageRequest::sanitized_model`] before any downstream use.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UsageRequest {
    /// Model identifier as supplied by the caller, possibly misspelled or
    /// carrying a version/date suffix.
    #[validate(
        length(min = 1, max = 100),
        custom(function = "validate_model_name")
    )]
    pub model: String,

    /// Prompt tokens consumed by the call.
    #[validate(range(min = 0))]
    pub input_tokens: i64,

    /// Completion tokens produced by the call.
    #[validate(range(min = 0))]
    pub output_tokens: i64,

    /// Optional caller-supplied metadata, passed through untouched.
    #[serde(default)]
    #[validate(custom(function = "validate_metadata"))]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl UsageRequest {
    /// The model name trimmed and lower-cased, as used by the pipeline.
    pub fn sanitized_model(&self) -> String {
        self.model.trim().to_lowercase()
    }
}

/// Wire response for `POST /calculate`.
///
/// Returned with HTTP 200 for both successful calculations and handled
/// calculation failures; `success` distinguishes the two.
#[derive(Debug, Clone, Serialize)]
pub struct ImpactResponse {
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub energy_kwh: f64,
    pub gwp_kgco2eq: f64,
    pub calculation_id: String,
    /// ISO-8601 timestamp of when the response was produced.
    pub timestamp: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of one impact calculation.
///
/// A failed calculation always carries zero energy/emission figures.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationResult {
    pub energy_kwh: f64,
    pub gwp_kgco2eq: f64,
    pub success: bool,
    pub error: Option<String>,
    pub normalized_model: Option<String>,
}

impl CalculationResult {
    /// Build a successful result carrying the resolved model name.
    pub fn success_result(
        energy_kwh: f64,
        gwp_kgco2eq: f64,
        normalized_model: impl Into<String>,
    ) -> Self {
        Self {
            energy_kwh,
            gwp_kgco2eq,
            success: true,
            error: None,
            normalized_model: Some(normalized_model.into()),
        }
    }

    /// Build a failed result with zeroed figures.
    pub fn error_result(error: impl Into<String>) -> Self {
        Self {
            energy_kwh: 0.0,
            gwp_kgco2eq: 0.0,
            success: false,
            error: Some(error.into()),
            normalized_model: None,
        }
    }
}

/// Generic error body for non-200 API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    pub error: String,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn request(model: &str, input_tokens: i64, output_tokens: i64) -> UsageRequest {
        UsageRequest {
            model: model.to_string(),
            input_tokens,
            output_tokens,
            metadata: None,
        }
    }

    #[test]
    fn parses_minimal_request() {
        let req: UsageRequest = serde_json::from_value(json!({
            "model": "gpt-4o",
            "input_tokens": 1000,
            "output_tokens": 500
        }))
        .unwrap();

        assert_eq!(req.model, "gpt-4o");
        assert!(req.metadata.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn sanitized_model_trims_and_lowercases() {
        let req = request("  GPT-4o  ", 1, 1);
        assert_eq!(req.sanitized_model(), "gpt-4o");
    }

    #[test]
    fn rejects_negative_tokens() {
        assert!(request("gpt-4o", -1, 500).validate().is_err());
        assert!(request("gpt-4o", 1000, -5).validate().is_err());
    }

    #[test]
    fn rejects_disallowed_model_characters() {
        assert!(request("gpt@4o", 1, 1).validate().is_err());
    }

    #[test]
    fn rejects_oversized_metadata() {
        let mut req = request("gpt-4o", 1, 1);
        req.metadata = Some([("blob".to_string(), json!("x".repeat(2000)))].into());
        assert!(req.validate().is_err());
    }

    #[test]
    fn error_result_zeroes_figures() {
        let result = CalculationResult::error_result("boom");
        assert!(!result.success);
        assert_eq!(result.energy_kwh, 0.0);
        assert_eq!(result.gwp_kgco2eq, 0.0);
        assert!(result.normalized_model.is_none());
    }

    #[test]
    fn success_response_omits_error_field() {
        let response = ImpactResponse {
            model: "gpt-4o".into(),
            input_tokens: 1000,
            output_tokens: 500,
            total_tokens: 1500,
            energy_kwh: 0.001,
            gwp_kgco2eq: 0.0004,
            calculation_id: "calc-0123456789abcdef".into(),
            timestamp: "2025-06-01T00:00:00Z".into(),
            success: true,
            error: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
        assert_eq!(json["total_tokens"], 1500);
    }
}
