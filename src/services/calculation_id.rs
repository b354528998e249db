//! Calculation identifier generation.

use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

/// Number of hex characters kept from the digest.
const CALCULATION_ID_HEX_LENGTH: usize = 16;

/// Generate a short identifier for one calculation call.
///
/// Format: `calc-` followed by 16 lowercase hex characters, derived from a
/// SHA-256 hash of the inputs and the current wall-clock time. The time
/// component makes repeated calls with identical inputs produce different
/// IDs; the format is stable but uniqueness is only practical, not
/// guaranteed.
pub fn generate_calculation_id(model: &str, input_tokens: i64, output_tokens: i64) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos())
        .unwrap_or_default();
    let digest = Sha256::digest(format!("{model}|{input_tokens}|{output_tokens}|{nanos}"));
    format!(
        "calc-{}",
        &hex::encode(digest)[..CALCULATION_ID_HEX_LENGTH]
    )
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use regex::Regex;

    use super::*;

    static ID_PATTERN: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^calc-[0-9a-f]{16}$").unwrap());

    #[test]
    fn id_matches_expected_format() {
        let id = generate_calculation_id("gpt-4o", 1000, 500);
        assert!(ID_PATTERN.is_match(&id), "unexpected id format: {id}");
    }

    #[test]
    fn identical_inputs_produce_distinct_ids() {
        let first = generate_calculation_id("gpt-4o", 1000, 500);
        let second = generate_calculation_id("gpt-4o", 1000, 500);
        assert!(ID_PATTERN.is_match(&first));
        assert!(ID_PATTERN.is_match(&second));
        assert_ne!(first, second);
    }

    #[test]
    fn handles_empty_model_name() {
        let id = generate_calculation_id("", 0, 0);
        assert!(ID_PATTERN.is_match(&id));
    }
}
