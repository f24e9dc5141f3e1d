//! Analytics history: the column-oriented trend series a persona dashboard
//! plots, and the transforms between it and interaction rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{Result, StatsError};
use crate::stats::{InteractionRecord, Mean};

/// Parallel columns, one entry per interaction, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsHistory {
    pub timestamps: Vec<DateTime<Utc>>,
    pub response_times: Vec<f64>,
    pub similarities: Vec<f64>,
    #[serde(rename = "similarities_with_previous")]
    pub similarities_with_previous: Vec<Option<f64>>,
}

/// One row of the history, as shown in an interaction table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub response_time: f64,
    pub similarity: f64,
    pub similarity_with_previous: Option<f64>,
}

/// Chart row; similarities are scaled to percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: f64,
    pub similarity_pct: f64,
    pub consistency_with_previous_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRollup {
    pub day: NaiveDate,
    pub interactions: usize,
    pub average_response_time: f64,
    pub average_similarity: f64,
}

impl AnalyticsHistory {
    pub fn from_records(records: &[InteractionRecord]) -> Self {
        let mut history = Self::default();
        for record in records {
            history.timestamps.push(record.timestamp);
            history
                .response_times
                .push(record.response_time_ms as f64);
            history.similarities.push(record.similarity);
            history
                .similarities_with_previous
                .push(record.similarity_with_previous);
        }
        history
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Fails when the columns disagree on length.
    pub fn validate(&self) -> Result<()> {
        let expected = self.timestamps.len();
        let columns = [
            ("responseTimes", self.response_times.len()),
            ("similarities", self.similarities.len()),
            (
                "similarities_with_previous",
                self.similarities_with_previous.len(),
            ),
        ];
        for (name, len) in columns {
            if len != expected {
                return Err(StatsError::InvalidArgument(format!(
                    "history column {name} has {len} entries, expected {expected}"
                )));
            }
        }
        Ok(())
    }

    /// Zip the columns into rows.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>> {
        self.validate()?;
        Ok((0..self.len())
            .map(|i| HistoryEntry {
                timestamp: self.timestamps[i],
                response_time: self.response_times[i],
                similarity: self.similarities[i],
                similarity_with_previous: self.similarities_with_previous[i],
            })
            .collect())
    }

    pub fn trend_points(&self) -> Result<Vec<TrendPoint>> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|entry| TrendPoint {
                timestamp: entry.timestamp,
                response_time_ms: entry.response_time,
                similarity_pct: entry.similarity * 100.0,
                consistency_with_previous_pct: entry.similarity_with_previous.map(|s| s * 100.0),
            })
            .collect())
    }

    /// Per-UTC-day means, ordered by day.
    pub fn daily_rollup(&self) -> Result<Vec<DailyRollup>> {
        let mut days: BTreeMap<NaiveDate, (Mean, Mean)> = BTreeMap::new();
        for entry in self.entries()? {
            let (response_time, similarity) = days.entry(entry.timestamp.date_naive()).or_default();
            response_time.push(entry.response_time);
            similarity.push(entry.similarity);
        }

        Ok(days
            .into_iter()
            .map(|(day, (response_time, similarity))| DailyRollup {
                day,
                interactions: response_time.count(),
                average_response_time: response_time.value().unwrap_or_default(),
                average_similarity: similarity.value().unwrap_or_default(),
            })
            .collect())
    }
}
