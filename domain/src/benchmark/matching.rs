//! Keyword-based insight matching.
//!
//! Matching is deliberately lexical: a ground-truth insight is found in a
//! claim when at least a minimum fraction of its keywords occur in the claim
//! as case-insensitive substrings.

use serde::{Deserialize, Serialize};

/// Claims shorter than this (after trimming) are ignored
pub const MIN_CLAIM_CHARS: usize = 5;

/// Fractions are compared with this tolerance so that 2/3 >= 0.666... holds
const FRACTION_EPSILON: f64 = 1e-9;

/// A claim that is long enough to be scored
pub fn is_scorable_claim(claim: &str) -> bool {
    claim.trim().chars().count() >= MIN_CLAIM_CHARS
}

/// Fraction of non-blank `keywords` that occur in `claim`
pub fn keyword_fraction(keywords: &[String], claim: &str) -> f64 {
    let claim = claim.to_lowercase();
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();
    if keywords.is_empty() {
        return 0.0;
    }
    let hits = keywords.iter().filter(|k| claim.contains(k.as_str())).count();
    hits as f64 / keywords.len() as f64
}

/// Whether `claim` mentions enough of `keywords`
pub fn claim_matches(keywords: &[String], min_fraction: f64, claim: &str) -> bool {
    is_scorable_claim(claim) && keyword_fraction(keywords, claim) + FRACTION_EPSILON >= min_fraction
}

/// Reasoning depth of a claim, judged from marker words
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DepthLevel {
    /// States what the chart shows
    Descriptive,
    /// Explains why
    Diagnostic,
    /// Anticipates what follows
    Predictive,
}

const PREDICTIVE_MARKERS: &[&str] = &["will", "forecast", "predict", "expect", "if", "assume"];
const DIAGNOSTIC_MARKERS: &[&str] = &[
    "because",
    "due to",
    "caused by",
    "reason",
    "therefore",
    "thus",
    "indicate",
];

impl DepthLevel {
    pub fn of(claim: &str) -> DepthLevel {
        let words: Vec<String> = claim
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        let padded = format!(" {} ", words.join(" "));
        let has_marker = |markers: &[&str]| {
            markers
                .iter()
                .any(|m| padded.contains(&format!(" {} ", m)) || starts_word(&words, m))
        };

        if has_marker(PREDICTIVE_MARKERS) {
            DepthLevel::Predictive
        } else if has_marker(DIAGNOSTIC_MARKERS) {
            DepthLevel::Diagnostic
        } else {
            DepthLevel::Descriptive
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            DepthLevel::Descriptive => 1,
            DepthLevel::Diagnostic => 2,
            DepthLevel::Predictive => 3,
        }
    }
}

/// Inflected forms: "predicts", "indicates", "expected"
fn starts_word(words: &[String], marker: &str) -> bool {
    marker.len() >= 6 && words.iter().any(|w| w.starts_with(marker))
}

/// Length of the longest common subsequence of two tool sequences
pub fn longest_common_subsequence<A, B>(a: &[A], b: &[B]) -> usize
where
    A: AsRef<str>,
    B: AsRef<str>,
{
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i][j] = if a[i - 1].as_ref() == b[j - 1].as_ref() {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }
    table[a.len()][b.len()]
}
