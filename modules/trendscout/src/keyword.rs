//! Topic → canonical keyword + a bounded, deterministic set of search variants.

use serde::{Deserialize, Serialize};

use trendscout_common::{create_seed, seeded_random};

const STOP_WORDS: &[&str] = &["the", "a", "an", "and", "for", "avec", "les", "des"];

const SUFFIXES: &[&str] = &["2025", "growth", "automation", "premium", "ai"];

/// Keyword used when a topic normalizes to nothing at all.
const DEFAULT_KEYWORD: &str = "trends";

/// Base keyword + every suffix + "tools".
pub const MAX_VARIANTS: usize = 1 + SUFFIXES.len() + 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedKeyword {
    pub keyword: String,
    /// Base keyword first, then suffixed variants. Never empty.
    pub variants: Vec<String>,
}

pub fn normalize_keyword(raw: &str) -> NormalizedKeyword {
    let lowered = raw.to_lowercase();
    let mut keyword = lowered
        .split_whitespace()
        .filter(|token| !STOP_WORDS.contains(token))
        .collect::<Vec<_>>()
        .join(" ");

    if keyword.is_empty() {
        keyword = lowered.split_whitespace().collect::<Vec<_>>().join(" ");
    }
    if keyword.is_empty() {
        keyword = DEFAULT_KEYWORD.to_string();
    }

    let seed = create_seed(&keyword);
    let mut variants = vec![keyword.clone()];
    let mut push = |variant: String| {
        if !variants.contains(&variant) {
            variants.push(variant);
        }
    };

    for (index, suffix) in SUFFIXES.iter().enumerate() {
        if seeded_random(seed + index as u64) > 0.3 {
            push(format!("{keyword} {suffix}"));
        }
    }
    if keyword.contains("ai") || seeded_random(seed) > 0.6 {
        push(format!("{keyword} tools"));
    }

    NormalizedKeyword { keyword, variants }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_words_are_dropped_and_case_folded() {
        let normalized = normalize_keyword("The Best  Apps for Runners");
        assert_eq!(normalized.keyword, "best apps runners");
        assert_eq!(normalized.variants[0], "best apps runners");
    }

    #[test]
    fn french_stop_words_are_dropped() {
        assert_eq!(normalize_keyword("Recettes avec les légumes").keyword, "recettes légumes");
    }

    #[test]
    fn same_topic_gives_same_variants() {
        let a = normalize_keyword("fitness apps");
        let b = normalize_keyword("  FITNESS   apps ");
        assert_eq!(a, b);
    }

    #[test]
    fn variants_are_bounded_unique_and_prefixed() {
        for topic in ["fitness apps", "meal prep", "yoga", "crm", "ai writing", "x"] {
            let normalized = normalize_keyword(topic);
            assert!(normalized.variants.len() <= MAX_VARIANTS);
            let unique: std::collections::BTreeSet<_> = normalized.variants.iter().collect();
            assert_eq!(unique.len(), normalized.variants.len());
            assert!(normalized
                .variants
                .iter()
                .all(|v| v.starts_with(&normalized.keyword)));
        }
    }

    #[test]
    fn known_keywords_expand_to_exact_variants() {
        assert_eq!(
            normalize_keyword("crm").variants,
            ["crm", "crm automation", "crm premium", "crm ai"]
        );
        assert_eq!(
            normalize_keyword("Yoga").variants,
            [
                "yoga",
                "yoga 2025",
                "yoga growth",
                "yoga automation",
                "yoga premium",
                "yoga ai",
                "yoga tools",
            ]
        );
    }

    #[test]
    fn keywords_containing_ai_always_get_tools() {
        let normalized = normalize_keyword("email ai");
        assert!(normalized.variants.contains(&"email ai tools".to_string()));
        // substring match, not word match
        let normalized = normalize_keyword("mountain trails");
        assert!(normalized.variants.contains(&"mountain trails tools".to_string()));
    }

    #[test]
    fn all_stop_words_falls_back_to_raw_text() {
        assert_eq!(normalize_keyword("The").keyword, "the");
        assert_eq!(normalize_keyword("   ").keyword, DEFAULT_KEYWORD);
    }
}
