//! Bag-of-words cosine similarity.
//!
//! Texts are lower-cased and split on runs of non-word characters, then
//! compared as token frequency vectors. Every place that scores a pair of
//! texts goes through [`similarity`].

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Runs of ASCII non-word characters (the `\W+` class).
const NON_WORD_PATTERN: &str = r"[^A-Za-z0-9_]+";

static NON_WORD: OnceLock<Regex> = OnceLock::new();

fn non_word() -> &'static Regex {
    NON_WORD.get_or_init(|| Regex::new(NON_WORD_PATTERN).expect("static pattern compiles"))
}

/// Lower-case `text` and split it into word tokens.
///
/// No stemming or stop-word removal. Empty and punctuation-only strings
/// produce no tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    non_word()
        .split(&lowered)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Token -> occurrence count for a single text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyVector {
    counts: HashMap<String, u32>,
}

impl FrequencyVector {
    pub fn from_text(text: &str) -> Self {
        Self::from_tokens(tokenize(text))
    }

    pub fn from_tokens<I>(tokens: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut counts = HashMap::new();
        for token in tokens {
            *counts.entry(token).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of distinct tokens.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn count(&self, token: &str) -> u32 {
        self.counts.get(token).copied().unwrap_or(0)
    }

    pub fn magnitude(&self) -> f64 {
        self.squared_norm().sqrt()
    }

    fn squared_norm(&self) -> f64 {
        self.counts
            .values()
            .map(|&c| f64::from(c) * f64::from(c))
            .sum()
    }

    /// Dot product over the union of both token sets. Tokens missing from
    /// one side contribute zero, so iterating the smaller map is enough.
    pub fn dot(&self, other: &FrequencyVector) -> f64 {
        let (small, large) = if self.counts.len() <= other.counts.len() {
            (self, other)
        } else {
            (other, self)
        };
        small
            .counts
            .iter()
            .map(|(token, &c)| f64::from(c) * f64::from(large.count(token)))
            .sum()
    }

    /// Cosine of the angle between the two vectors, in `[0, 1]`.
    ///
    /// Returns 0.0 when either vector has no tokens.
    pub fn cosine(&self, other: &FrequencyVector) -> f64 {
        let norm1 = self.squared_norm();
        let norm2 = other.squared_norm();
        if norm1 == 0.0 || norm2 == 0.0 {
            return 0.0;
        }
        // sqrt of the product keeps identical vectors at exactly 1.0
        (self.dot(other) / (norm1 * norm2).sqrt()).clamp(0.0, 1.0)
    }
}

/// Cosine similarity between the token frequency vectors of two texts.
///
/// Symmetric, and 1.0 for any text compared with itself as long as it has
/// at least one word character. Token-less input scores 0.0.
pub fn similarity(text1: &str, text2: &str) -> f64 {
    FrequencyVector::from_text(text1).cosine(&FrequencyVector::from_text(text2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const EPSILON: f64 = 1e-12;

    #[test]
    fn test_tokenize_lowercases_and_splits() {
        assert_eq!(
            tokenize("Hello, World! it's snake_case 42"),
            vec!["hello", "world", "it", "s", "snake_case", "42"]
        );
    }

    #[test]
    fn test_tokenize_empty_and_punctuation() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("!!! ... ???").is_empty());
        assert!(tokenize("   \t\n").is_empty());
    }

    #[test]
    fn test_tokenize_non_ascii_is_separator() {
        // Only ASCII letters, digits and underscore count as word characters.
        assert_eq!(tokenize("Café au lait"), vec!["caf", "au", "lait"]);
    }

    #[test]
    fn test_frequency_vector_counts() {
        let vector = FrequencyVector::from_text("the cat and the hat");
        assert_eq!(vector.len(), 4);
        assert_eq!(vector.count("the"), 2);
        assert_eq!(vector.count("cat"), 1);
        assert_eq!(vector.count("dog"), 0);
        assert!((vector.magnitude() - 7f64.sqrt()).abs() < EPSILON);
    }

    #[test]
    fn test_identical_text_scores_one() {
        for text in ["a", "The cat sat on the mat", "x y x y z", "MiXeD case"] {
            assert!((similarity(text, text) - 1.0).abs() < EPSILON, "{text}");
        }
    }

    #[test]
    fn test_case_and_punctuation_ignored() {
        assert!((similarity("Hello, World!", "hello world") - 1.0).abs() < EPSILON);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("The cat sat on the mat", "The cat sat on the rug"),
            ("a a a b", "b c"),
            ("", "anything"),
            ("one two three", "three three two"),
        ];
        for (a, b) in pairs {
            assert_eq!(similarity(a, b), similarity(b, a));
        }
    }

    #[test]
    fn test_tokenless_input_scores_zero() {
        assert_eq!(similarity("", "anything"), 0.0);
        assert_eq!(similarity("anything", ""), 0.0);
        assert_eq!(similarity("!!!", "???"), 0.0);
        assert_eq!(similarity("", ""), 0.0);
    }

    #[test]
    fn test_disjoint_texts_score_zero() {
        assert_eq!(similarity("x", "y"), 0.0);
    }

    #[test]
    fn test_related_texts_rank_above_unrelated() {
        let mat = "The cat sat on the mat";
        let rug = "The cat sat on the rug";
        let quantum = "Quantum physics is hard";

        let close = similarity(mat, rug);
        let far = similarity(mat, quantum);
        assert!(close > 0.0 && close < 1.0);
        assert!(close > far);
    }

    #[test]
    fn test_known_value() {
        // [the:2, cat, sat, on, mat] vs [the:2, cat, sat, on, rug]: dot = 7, |v| = sqrt(8)
        let score = similarity("The cat sat on the mat", "The cat sat on the rug");
        assert!((score - 7.0 / 8.0).abs() < EPSILON);
    }

    #[test]
    fn test_bounded() {
        let texts = [
            "",
            "a",
            "a a a a a a a a",
            "a b c d e f g",
            "lorem ipsum dolor sit amet lorem",
            "!!!",
        ];
        for a in texts {
            for b in texts {
                let score = similarity(a, b);
                assert!((0.0..=1.0).contains(&score), "{a:?} vs {b:?} = {score}");
            }
        }
    }
}
