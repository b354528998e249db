//! Model name normalization for common typos and spelling variants.
//!
//! This is the first, cheapest line of defense against automation platforms
//! sending `gpt4o` where the oracle expects `gpt-4o`. It is a pure string
//! transform: known misspellings are rewritten to canonical names, everything
//! else passes through unchanged so the caller's own validation handles it.

use std::{collections::HashMap, sync::LazyLock};

use regex::Regex;

/// Direct typo → canonical mappings for the common mistakes seen in the wild.
/// Canonical spellings map to themselves so normalization is idempotent.
static TYPO_TABLE: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        // OpenAI variations
        ("gpt4o", "gpt-4o"),
        ("gpt-4o", "gpt-4o"),
        ("gpt4omini", "gpt-4o-mini"),
        ("gpt-4o-mini", "gpt-4o-mini"),
        ("gpt4o-mini", "gpt-4o-mini"),
        ("gpt-4omini", "gpt-4o-mini"),
        ("gpt35turbo", "gpt-3.5-turbo"),
        ("gpt-35-turbo", "gpt-3.5-turbo"),
        ("gpt3.5turbo", "gpt-3.5-turbo"),
        ("gpt4", "gpt-4"),
        // Claude variations
        ("claudeopus", "claude-3-opus"),
        ("claude3opus", "claude-3-opus"),
        ("claude-3opus", "claude-3-opus"),
        ("claudesonnet", "claude-3-sonnet"),
        ("claude3sonnet", "claude-3-sonnet"),
        ("claude-3sonnet", "claude-3-sonnet"),
        ("claudehaiku", "claude-3-haiku"),
        ("claude3haiku", "claude-3-haiku"),
        ("claude-3haiku", "claude-3-haiku"),
        ("claude35sonnet", "claude-3-5-sonnet"),
        ("claude-35-sonnet", "claude-3-5-sonnet"),
        ("claude3.5sonnet", "claude-3-5-sonnet"),
        // Gemini variations
        ("geminipro", "gemini-pro"),
        ("gemini1.5pro", "gemini-1.5-pro"),
        ("gemini15pro", "gemini-1.5-pro"),
        ("gemini-15-pro", "gemini-1.5-pro"),
    ])
});

/// `gpt4` followed by a word boundary (so `gpt4turbo` is not rewritten).
static GPT4_BARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^gpt4\b").unwrap());

/// Claude names with a version digit glued to the word, e.g. `claude35sonnet`.
static CLAUDE_VERSIONED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^claude\d").unwrap());

/// Normalize a model name, fixing known typos and hyphenation variants.
///
/// Unknown names are returned unmodified, never rejected; whitespace-only
/// input returns the original string untouched.
pub fn normalize(input: &str) -> String {
    let name = input.trim().to_lowercase();
    if name.is_empty() {
        return input.to_string();
    }

    if let Some(canonical) = TYPO_TABLE.get(name.as_str()) {
        return (*canonical).to_string();
    }

    // Hyphen-less GPT spellings: gpt4o, gpt4omini, gpt35turbo, ...
    if name.contains("gpt") && !name.contains('-') {
        if name.starts_with("gpt4o") {
            if name.contains("mini") {
                return "gpt-4o-mini".to_string();
            }
            return "gpt-4o".to_string();
        }
        if name.starts_with("gpt35") || name.starts_with("gpt3.5") {
            return "gpt-3.5-turbo".to_string();
        }
        if GPT4_BARE.is_match(&name) {
            return "gpt-4".to_string();
        }
    }

    // Claude spellings with the version glued on: claude3opus, claude35sonnet, ...
    if name.contains("claude") && CLAUDE_VERSIONED.is_match(&name) {
        if name.contains("opus") {
            return "claude-3-opus".to_string();
        }
        if name.contains("sonnet") {
            if name.contains("35") || name.contains("3.5") {
                return "claude-3-5-sonnet".to_string();
            }
            return "claude-3-sonnet".to_string();
        }
        if name.contains("haiku") {
            return "claude-3-haiku".to_string();
        }
    }

    // Hyphen-less Gemini spellings: geminipro, gemini15pro, ...
    if name.contains("gemini") && !name.contains('-') {
        if name.contains("1.5") || name.contains("15") {
            return "gemini-1.5-pro".to_string();
        }
        if name.contains("pro") {
            return "gemini-pro".to_string();
        }
    }

    input.to_string()
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("gpt4o", "gpt-4o")]
    #[case("GPT4O", "gpt-4o")]
    #[case("gpt4omini", "gpt-4o-mini")]
    #[case("gpt-4omini", "gpt-4o-mini")]
    #[case("gpt35turbo", "gpt-3.5-turbo")]
    #[case("gpt-35-turbo", "gpt-3.5-turbo")]
    #[case("gpt4", "gpt-4")]
    #[case("claude3opus", "claude-3-opus")]
    #[case("claudesonnet", "claude-3-sonnet")]
    #[case("claude35sonnet", "claude-3-5-sonnet")]
    #[case("claude3.5sonnet", "claude-3-5-sonnet")]
    #[case("claude3haiku", "claude-3-haiku")]
    #[case("geminipro", "gemini-pro")]
    #[case("gemini15pro", "gemini-1.5-pro")]
    #[case("gemini-15-pro", "gemini-1.5-pro")]
    fn fixes_known_typos(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[rstest]
    #[case("gpt-4o")]
    #[case("gpt-4o-mini")]
    #[case("gpt-3.5-turbo")]
    #[case("claude-3-opus")]
    #[case("claude-3-5-sonnet")]
    #[case("gemini-1.5-pro")]
    #[case("mistral-large")]
    fn canonical_names_are_fixed_points(#[case] name: &str) {
        assert_eq!(normalize(name), name);
    }

    #[rstest]
    #[case("claude35haiku", "claude-3-haiku")]
    #[case("gemini15", "gemini-1.5-pro")]
    fn heuristics_reconstruct_hyphenated_forms(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn trims_and_lowercases_before_lookup() {
        assert_eq!(normalize("  Claude35Sonnet  "), "claude-3-5-sonnet");
    }

    #[test]
    fn whitespace_only_input_is_returned_untouched() {
        assert_eq!(normalize("   "), "   ");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn unknown_names_pass_through_unmodified() {
        assert_eq!(normalize("llama-3-70b"), "llama-3-70b");
        assert_eq!(normalize("Definitely-Not-A-Model"), "Definitely-Not-A-Model");
    }

    #[test]
    fn gpt4_with_suffix_is_not_rewritten_to_gpt4() {
        // "gpt4turbo" has no word boundary after the 4, so the bare-gpt4 rule
        // must not fire; it falls through unchanged.
        assert_eq!(normalize("gpt4turbo"), "gpt4turbo");
    }
}
