//! Per-interaction records and the aggregate statistics derived from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::similarity::similarity;
use crate::tokens::TokenEstimator;

/// One user-input / model-response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionRecord {
    pub input: String,
    pub response: String,
    /// When the response was produced.
    pub timestamp: DateTime<Utc>,
    /// Response timestamp minus the preceding user timestamp. Not clamped:
    /// out-of-order timestamps yield a negative value.
    pub response_time_ms: i64,
    /// Similarity between `input` and `response`.
    pub similarity: f64,
    /// Similarity between this response and the previous one in the
    /// sequence; `None` for the first record.
    pub similarity_with_previous: Option<f64>,
    pub tokens_used: usize,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl InteractionRecord {
    /// Build a record from the two sides of an exchange and their timestamps.
    pub fn from_exchange(
        input: impl Into<String>,
        input_at: DateTime<Utc>,
        response: impl Into<String>,
        response_at: DateTime<Utc>,
        estimator: &dyn TokenEstimator,
    ) -> Self {
        let response_time_ms = (response_at - input_at).num_milliseconds();
        Self::with_response_time(input, response, response_at, response_time_ms, estimator)
    }

    /// Build a record when the response time was measured elsewhere.
    pub fn with_response_time(
        input: impl Into<String>,
        response: impl Into<String>,
        timestamp: DateTime<Utc>,
        response_time_ms: i64,
        estimator: &dyn TokenEstimator,
    ) -> Self {
        let input = input.into();
        let response = response.into();
        let usage = estimator.usage(&input, &response);
        Self {
            similarity: similarity(&input, &response),
            input,
            response,
            timestamp,
            response_time_ms,
            similarity_with_previous: None,
            tokens_used: usage.total_tokens,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        }
    }
}

/// Fill `similarity_with_previous` for a chronologically ordered sequence.
/// The sequence is not sorted here.
pub fn link_previous(records: &mut [InteractionRecord]) {
    if let Some(first) = records.first_mut() {
        first.similarity_with_previous = None;
    }
    for i in 1..records.len() {
        let score = similarity(&records[i - 1].response, &records[i].response);
        records[i].similarity_with_previous = Some(score);
    }
}

/// Summary over a sequence of interactions.
///
/// Averages with no samples are `None` rather than NaN: all of them for an
/// empty sequence, and `average_similarity_with_previous` whenever there are
/// fewer than two records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_interactions: usize,
    pub average_response_time: Option<f64>,
    pub average_similarity: Option<f64>,
    pub average_similarity_with_previous: Option<f64>,
}

/// Running mean that reports `None` until it has seen a sample.
#[derive(Debug, Clone, Copy, Default)]
pub struct Mean {
    sum: f64,
    count: usize,
}

impl Mean {
    pub fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn value(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }
}

impl FromIterator<f64> for Mean {
    fn from_iter<I: IntoIterator<Item = f64>>(iter: I) -> Self {
        let mut mean = Mean::default();
        for value in iter {
            mean.push(value);
        }
        mean
    }
}

/// Fold a chronologically ordered sequence into [`AggregateStats`].
///
/// Similarities are recomputed from the record text, so stored scores do not
/// need to be trusted.
pub fn aggregate(records: &[InteractionRecord]) -> AggregateStats {
    let response_time: Mean = records.iter().map(|r| r.response_time_ms as f64).collect();
    let input_similarity: Mean = records
        .iter()
        .map(|r| similarity(&r.input, &r.response))
        .collect();
    let previous_similarity: Mean = records
        .windows(2)
        .map(|pair| similarity(&pair[0].response, &pair[1].response))
        .collect();

    log::debug!(
        "aggregated {} interactions ({} consecutive pairs)",
        records.len(),
        previous_similarity.count()
    );

    AggregateStats {
        total_interactions: records.len(),
        average_response_time: response_time.value(),
        average_similarity: input_similarity.value(),
        average_similarity_with_previous: previous_similarity.value(),
    }
}
