//! Coarse similarity bands and the per-output view used to review persona
//! responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::batch::{score_pairs, TextPair};
use crate::conversation::Chat;
use crate::errors::{Result, StatsError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityBand {
    High,
    Medium,
    Low,
}

impl SimilarityBand {
    pub fn label(&self) -> &'static str {
        match self {
            SimilarityBand::High => "High Similarity",
            SimilarityBand::Medium => "Medium Similarity",
            SimilarityBand::Low => "Low Similarity",
        }
    }
}

impl std::str::FromStr for SimilarityBand {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "high" => Ok(SimilarityBand::High),
            "medium" => Ok(SimilarityBand::Medium),
            "low" => Ok(SimilarityBand::Low),
            other => Err(StatsError::InvalidArgument(format!(
                "unknown similarity band '{other}'"
            ))),
        }
    }
}

/// Lower bounds (inclusive) of the high and medium bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimilarityBands {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

fn default_high() -> f64 {
    0.7
}

fn default_medium() -> f64 {
    0.4
}

impl Default for SimilarityBands {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}

impl SimilarityBands {
    pub fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=1.0).contains(&v);
        if !in_range(self.high) || !in_range(self.medium) {
            return Err(StatsError::invalid_argument(
                "similarity band thresholds must be within [0, 1]",
            ));
        }
        if self.medium >= self.high {
            return Err(StatsError::InvalidArgument(format!(
                "medium threshold {} must be below high threshold {}",
                self.medium, self.high
            )));
        }
        Ok(())
    }

    pub fn classify(&self, similarity: f64) -> SimilarityBand {
        if similarity >= self.high {
            SimilarityBand::High
        } else if similarity >= self.medium {
            SimilarityBand::Medium
        } else {
            SimilarityBand::Low
        }
    }
}

/// One user input and the persona's reply, scored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputAnalysis {
    pub user_input: String,
    pub ai_output: String,
    pub similarity: f64,
    pub band: SimilarityBand,
    pub timestamp: DateTime<Utc>,
    pub chat_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BandCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Every exchange across a persona's chats, newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputReport {
    pub outputs: Vec<OutputAnalysis>,
    pub counts: BandCounts,
}

impl OutputReport {
    pub fn from_chats(chats: &[Chat], bands: &SimilarityBands) -> Self {
        let exchanges: Vec<(&str, _, _)> = chats
            .iter()
            .flat_map(|chat| {
                chat.exchanges()
                    .map(move |(user, reply)| (chat.id.as_str(), user, reply))
            })
            .collect();

        let pairs: Vec<TextPair> = exchanges
            .iter()
            .map(|(_, user, reply)| TextPair::new(user.content.as_str(), reply.content.as_str()))
            .collect();
        let scores = score_pairs(&pairs);

        let mut outputs: Vec<OutputAnalysis> = exchanges
            .into_iter()
            .zip(scores)
            .map(|((chat_id, user, reply), similarity)| OutputAnalysis {
                user_input: user.content.clone(),
                ai_output: reply.content.clone(),
                similarity,
                band: bands.classify(similarity),
                timestamp: reply.timestamp,
                chat_id: chat_id.to_string(),
            })
            .collect();
        outputs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut counts = BandCounts::default();
        for output in &outputs {
            match output.band {
                SimilarityBand::High => counts.high += 1,
                SimilarityBand::Medium => counts.medium += 1,
                SimilarityBand::Low => counts.low += 1,
            }
        }

        Self { outputs, counts }
    }

    pub fn filter(&self, band: SimilarityBand) -> impl Iterator<Item = &OutputAnalysis> {
        self.outputs.iter().filter(move |o| o.band == band)
    }
}
