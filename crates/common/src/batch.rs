use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{Result, StatsError};
use crate::similarity::similarity;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextPair {
    pub text1: String,
    pub text2: String,
}

impl TextPair {
    pub fn new(text1: impl Into<String>, text2: impl Into<String>) -> Self {
        Self {
            text1: text1.into(),
            text2: text2.into(),
        }
    }

    pub fn score(&self) -> f64 {
        similarity(&self.text1, &self.text2)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSimilarityRequest {
    pub pairs: Vec<TextPair>,
}

/// Score every pair; output position `i` belongs to input pair `i`.
pub fn score_pairs(pairs: &[TextPair]) -> Vec<f64> {
    pairs.iter().map(TextPair::score).collect()
}

/// Score a raw `{ "pairs": [{ "text1": .., "text2": .. }, ..] }` body.
///
/// Missing or non-string text fields are rejected rather than coerced.
pub fn score_pairs_json(body: &Value) -> Result<Vec<f64>> {
    let pairs = body
        .get("pairs")
        .and_then(Value::as_array)
        .ok_or_else(|| StatsError::invalid_argument("pairs must be an array"))?;

    pairs
        .iter()
        .enumerate()
        .map(|(index, pair)| {
            let text1 = text_field(pair, "text1", index)?;
            let text2 = text_field(pair, "text2", index)?;
            Ok(similarity(text1, text2))
        })
        .collect()
}

fn text_field<'a>(pair: &'a Value, field: &str, index: usize) -> Result<&'a str> {
    pair.get(field).and_then(Value::as_str).ok_or_else(|| {
        StatsError::InvalidArgument(format!("pairs[{index}].{field} must be a string"))
    })
}
