//! Thematic pattern classification over free text.
//!
//! A fixed table maps pattern labels to marker phrases. An item carries a
//! pattern when the pattern's markers occur at least [`MARKER_THRESHOLD`]
//! times in the item's concatenated text fields, matched case-insensitively
//! and only as whole words or phrases. Classification is pure: same text,
//! same result.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;

/// Set of matched pattern labels for one item.
pub type PatternSet = BTreeSet<String>;

/// A named thematic pattern and the marker phrases that signal it.
#[derive(Debug, Clone, Copy)]
pub struct ThematicPattern {
    pub label: &'static str,
    pub markers: &'static [&'static str],
}

/// Minimum total marker occurrences before a pattern is reported.
const MARKER_THRESHOLD: usize = 3;

/// The closed pattern vocabulary.
pub static THEMATIC_PATTERNS: &[ThematicPattern] = &[
    ThematicPattern {
        label: "Unreliable Reality",
        markers: &[
            "dream",
            "simulation",
            "memory",
            "hallucination",
            "illusion",
            "perception",
            "reality",
        ],
    },
    ThematicPattern {
        label: "Corporate Dystopia",
        markers: &[
            "corporation",
            "dystopia",
            "dystopian",
            "surveillance",
            "megacorp",
            "conglomerate",
            "oppression",
        ],
    },
    ThematicPattern {
        label: "Slow-Burn Mystery",
        markers: &[
            "mystery",
            "clue",
            "investigation",
            "detective",
            "disappearance",
            "secret",
        ],
    },
    ThematicPattern {
        label: "Found Family",
        markers: &[
            "family",
            "belonging",
            "outcast",
            "orphan",
            "crew",
            "bond",
        ],
    },
    ThematicPattern {
        label: "Moral Descent",
        markers: &[
            "corruption",
            "greed",
            "descent",
            "crime",
            "empire",
            "downfall",
            "ruthless",
        ],
    },
    ThematicPattern {
        label: "Survival Against Odds",
        markers: &[
            "survival",
            "survive",
            "stranded",
            "wilderness",
            "apocalypse",
            "outbreak",
            "escape",
        ],
    },
    ThematicPattern {
        label: "Political Intrigue",
        markers: &[
            "throne",
            "betrayal",
            "conspiracy",
            "politics",
            "power struggle",
            "alliance",
        ],
    },
    ThematicPattern {
        label: "Technological Hubris",
        markers: &[
            "artificial intelligence",
            "experiment",
            "invention",
            "scientist",
            "machine",
            "technology",
        ],
    },
];

/// Marker regexes compiled once, parallel to [`THEMATIC_PATTERNS`].
static COMPILED_MARKERS: Lazy<Vec<Vec<Regex>>> = Lazy::new(|| {
    THEMATIC_PATTERNS
        .iter()
        .map(|pattern| {
            pattern
                .markers
                .iter()
                .map(|marker| {
                    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(marker)))
                        .expect("marker phrases compile to valid regexes")
                })
                .collect()
        })
        .collect()
});

/// Classify concatenated free text into the set of matching pattern labels.
pub fn classify(text: &str) -> PatternSet {
    let mut matched = PatternSet::new();
    if text.is_empty() {
        return matched;
    }

    for (pattern, regexes) in THEMATIC_PATTERNS.iter().zip(COMPILED_MARKERS.iter()) {
        let occurrences: usize = regexes
            .iter()
            .map(|regex| regex.find_iter(text).count())
            .sum();
        if occurrences >= MARKER_THRESHOLD {
            matched.insert(pattern.label.to_string());
        }
    }

    matched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_text_matches_nothing() {
        assert!(classify("").is_empty());
    }

    #[test]
    fn test_threshold_boundary() {
        // Two marker occurrences stay below the threshold.
        let two = "A dream inside a simulation.";
        assert!(!classify(two).contains("Unreliable Reality"));

        // Three occurrences cross it.
        let three = "A dream inside a simulation questions reality.";
        assert!(classify(three).contains("Unreliable Reality"));
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let text = "DREAM, Dream, dream.";
        assert!(classify(text).contains("Unreliable Reality"));
    }

    #[test]
    fn test_markers_match_whole_words_only() {
        // "daydream", "dreams" and "dreamer" must not count as "dream".
        let text = "A daydream about dreams kept the dreamer busy.";
        assert!(classify(text).is_empty());
    }

    #[test]
    fn test_multi_word_marker_phrases() {
        let text = "A power struggle over the throne ends in betrayal.";
        assert!(classify(text).contains("Political Intrigue"));
    }

    #[test]
    fn test_repeated_single_marker_counts() {
        let text = "Crime begets crime, and crime pays nobody.";
        assert!(classify(text).contains("Moral Descent"));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let text = "Corruption, greed and a slow descent into crime.";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn test_labels_belong_to_fixed_vocabulary() {
        let text = "dream simulation reality mystery clue investigation";
        for label in classify(text) {
            assert!(THEMATIC_PATTERNS.iter().any(|p| p.label == label));
        }
    }
}
