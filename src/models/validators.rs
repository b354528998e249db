use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;
use validator::ValidationError;

/// Maximum length of a model name accepted anywhere in the pipeline.
pub const MODEL_NAME_MAX_LENGTH: usize = 100;

/// Maximum number of key-value pairs in request metadata.
pub const METADATA_MAX_KEYS: usize = 10;

/// Maximum serialized size of request metadata in bytes.
pub const METADATA_MAX_SERIALIZED_BYTES: usize = 1000;

/// Regex for validating model names (alphanumerics plus `-`, `.`, `_`).
/// Examples: "gpt-4o", "claude-3-5-sonnet", "embed-english-v3.0"
pub static MODEL_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").unwrap());

/// Validate a model name against the inbound charset/length rule.
///
/// The same rule is re-applied to resolved names after normalization, since a
/// mapping table can reintroduce characters the original input never had.
pub fn validate_model_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();

    if trimmed.is_empty() {
        let mut err = ValidationError::new("model_name_empty");
        err.message = Some("Model name cannot be empty or whitespace-only".into());
        return Err(err);
    }

    if trimmed.len() > MODEL_NAME_MAX_LENGTH {
        let mut err = ValidationError::new("model_name_too_long");
        err.message = Some(
            format!(
                "Model name cannot exceed {} characters",
                MODEL_NAME_MAX_LENGTH
            )
            .into(),
        );
        return Err(err);
    }

    if !MODEL_NAME_REGEX.is_match(trimmed) {
        let mut err = ValidationError::new("model_name_invalid_chars");
        err.message = Some("Model name contains invalid characters".into());
        return Err(err);
    }

    Ok(())
}

/// Validate request metadata size and key count.
pub fn validate_metadata(
    metadata: &HashMap<String, serde_json::Value>,
) -> Result<(), ValidationError> {
    if metadata.len() > METADATA_MAX_KEYS {
        let mut err = ValidationError::new("metadata_too_many_keys");
        err.message = Some(
            format!(
                "Metadata cannot have more than {} key-value pairs, got {}",
                METADATA_MAX_KEYS,
                metadata.len()
            )
            .into(),
        );
        return Err(err);
    }

    let serialized = serde_json::to_string(metadata).map_err(|_| {
        let mut err = ValidationError::new("metadata_not_serializable");
        err.message = Some("Metadata is not serializable".into());
        err
    })?;

    if serialized.len() > METADATA_MAX_SERIALIZED_BYTES {
        let mut err = ValidationError::new("metadata_too_large");
        err.message = Some(format!("Metadata too large, limit is {} bytes", METADATA_MAX_SERIALIZED_BYTES).into());
        return Err(err);
    }

    Ok(())
}
