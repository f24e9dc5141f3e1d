use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use common::bands::{OutputReport, SimilarityBand, SimilarityBands};
use common::batch::score_pairs_json;
use common::citations::{extract_citations, Citation};
use common::conversation::{
    backfill_stats, derive_title, interactions_from_messages, Chat, ChatStats, PersonaStats,
};
use common::history::{AnalyticsHistory, DailyRollup, TrendPoint};
use common::stats::{aggregate, AggregateStats, InteractionRecord};
use common::tokens::TokenEstimator;
use serde::Serialize;
use tracing::{debug, info};

use crate::input::{HistoryInput, Transcript};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub interactions: Vec<InteractionRecord>,
    pub stats: AggregateStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat: Option<ChatStats>,
}

pub fn batch(body: &serde_json::Value) -> Result<Vec<f64>> {
    let scores = score_pairs_json(body).context("invalid batch similarity request")?;
    debug!(pairs = scores.len(), "scored batch");
    Ok(scores)
}

/// Compute stats for assistant replies stored without them; they then count
/// toward `ChatStats`.
pub fn backfill(transcript: &mut Transcript, estimator: &dyn TokenEstimator) {
    let filled = backfill_stats(transcript.messages_mut(), estimator);
    info!(filled, "backfilled message stats");
}

pub fn aggregate_transcript(
    transcript: &Transcript,
    estimator: &dyn TokenEstimator,
) -> AggregateReport {
    let title = match transcript {
        Transcript::Chat(chat) if !chat.title.is_empty() => Some(chat.title.clone()),
        _ => derive_title(transcript.messages()),
    };
    let interactions = interactions_from_messages(transcript.messages(), estimator);
    let stats = aggregate(&interactions);
    let chat = match transcript {
        Transcript::Chat(chat) => Some(ChatStats::from_chat(chat)),
        Transcript::Messages(_) => None,
    };
    info!(
        interactions = stats.total_interactions,
        estimator = estimator.name(),
        "aggregated transcript"
    );
    AggregateReport {
        title,
        interactions,
        stats,
        chat,
    }
}

pub fn persona(chats: &[Chat], persona_updated_at: Option<DateTime<Utc>>) -> PersonaStats {
    PersonaStats::from_chats(chats, persona_updated_at.unwrap_or_else(Utc::now))
}

pub fn outputs(
    chats: &[Chat],
    bands: &SimilarityBands,
    band: Option<SimilarityBand>,
) -> OutputReport {
    let mut report = OutputReport::from_chats(chats, bands);
    if let Some(band) = band {
        report.outputs = report.filter(band).cloned().collect();
    }
    info!(
        outputs = report.outputs.len(),
        high = report.counts.high,
        medium = report.counts.medium,
        low = report.counts.low,
        "analysed persona outputs"
    );
    report
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HistoryView {
    Trend(Vec<TrendPoint>),
    Daily(Vec<DailyRollup>),
}

pub fn history(
    input: &HistoryInput,
    estimator: &dyn TokenEstimator,
    daily: bool,
) -> Result<HistoryView> {
    let history = match input {
        HistoryInput::Columns(history) => history.clone(),
        HistoryInput::Transcript(transcript) => AnalyticsHistory::from_records(
            &interactions_from_messages(transcript.messages(), estimator),
        ),
    };

    let view = if daily {
        HistoryView::Daily(history.daily_rollup()?)
    } else {
        HistoryView::Trend(history.trend_points()?)
    };
    Ok(view)
}

pub fn citations(text: &str) -> Vec<Citation> {
    extract_citations(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{parse_chats, parse_history, parse_transcript};
    use common::tokens::ApproxTokenEstimator;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const CHAT: &str = r#"{
        "_id": "c1",
        "personaId": "p1",
        "messages": [
            {"content": "hi", "role": "user", "timestamp": "2024-03-01T10:00:00Z"},
            {"content": "hello", "role": "assistant", "timestamp": "2024-03-01T10:00:00.100Z",
             "stats": {"cosineSimilarity": 0.0, "responseTimeMs": 100}},
            {"content": "bye", "role": "user", "timestamp": "2024-03-02T10:00:00Z"},
            {"content": "goodbye", "role": "assistant", "timestamp": "2024-03-02T10:00:00.300Z",
             "stats": {"cosineSimilarity": 0.0, "responseTimeMs": 300}}
        ],
        "createdAt": "2024-03-01T10:00:00Z",
        "updatedAt": "2024-03-02T10:00:01Z"
    }"#;

    #[test]
    fn test_batch() {
        let body = json!({"pairs": [{"text1": "a b", "text2": "a b"}, {"text1": "x", "text2": "y"}]});
        assert_eq!(batch(&body).unwrap(), vec![1.0, 0.0]);
        assert!(batch(&json!({"pairs": 3})).is_err());
    }

    #[test]
    fn test_aggregate_chat() {
        let transcript = parse_transcript(CHAT).unwrap();
        let report = aggregate_transcript(&transcript, &ApproxTokenEstimator);

        assert_eq!(report.stats.total_interactions, 2);
        assert_eq!(report.stats.average_response_time, Some(200.0));
        assert_eq!(report.stats.average_similarity_with_previous, Some(0.0));
        assert_eq!(report.interactions[1].similarity_with_previous, Some(0.0));

        assert_eq!(report.title.as_deref(), Some("hi"));
        let chat = report.chat.unwrap();
        assert_eq!(chat.total_messages, 4);
        assert_eq!(chat.avg_response_time_ms, Some(200.0));
    }

    #[test]
    fn test_backfill_feeds_chat_stats() {
        let raw = r#"{"_id": "c2", "personaId": "p1", "title": "Greetings",
            "messages": [
                {"content": "red apple", "role": "user", "timestamp": "2024-03-01T10:00:00Z"},
                {"content": "red apple", "role": "assistant", "timestamp": "2024-03-01T10:00:00.400Z"}
            ],
            "createdAt": "2024-03-01T10:00:00Z", "updatedAt": "2024-03-01T10:00:01Z"}"#;

        let mut transcript = parse_transcript(raw).unwrap();
        let before = aggregate_transcript(&transcript, &ApproxTokenEstimator);
        assert_eq!(before.chat.unwrap().avg_cosine_similarity, None);

        backfill(&mut transcript, &ApproxTokenEstimator);
        let after = aggregate_transcript(&transcript, &ApproxTokenEstimator);
        assert_eq!(after.title.as_deref(), Some("Greetings"));
        let chat = after.chat.unwrap();
        assert_eq!(chat.avg_cosine_similarity, Some(1.0));
        assert_eq!(chat.avg_response_time_ms, Some(400.0));
    }

    #[test]
    fn test_aggregate_report_json() {
        let transcript = parse_transcript("[]").unwrap();
        let report = aggregate_transcript(&transcript, &ApproxTokenEstimator);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["stats"]["totalInteractions"], 0);
        assert!(json["stats"]["averageResponseTime"].is_null());
        assert!(json.get("chat").is_none());
        assert!(json.get("title").is_none());
    }

    #[test]
    fn test_persona_and_outputs() {
        let chats = parse_chats(&format!("[{CHAT}]")).unwrap();

        let seed = "2024-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let stats = persona(&chats, Some(seed));
        assert_eq!(stats.total_chats, 1);
        assert_eq!(stats.avg_response_time, Some(200.0));
        assert_eq!(stats.last_active, chats[0].updated_at);

        let report = outputs(&chats, &SimilarityBands::default(), Some(SimilarityBand::High));
        assert!(report.outputs.is_empty());
        assert_eq!(report.counts.low, 2);
    }

    #[test]
    fn test_outputs_band_filter_keeps_counts() {
        let chats = parse_chats(&format!("[{CHAT}]")).unwrap();
        let report = outputs(&chats, &SimilarityBands::default(), Some(SimilarityBand::Low));
        assert_eq!(report.outputs.len(), 2);
        assert!(report.outputs.iter().all(|o| o.band == SimilarityBand::Low));
        assert_eq!(report.outputs[0].user_input, "bye");
        assert_eq!(report.counts.low, 2);
    }

    #[test]
    fn test_history_views() {
        let input = parse_history(CHAT).unwrap();

        let HistoryView::Trend(points) = history(&input, &ApproxTokenEstimator, false).unwrap()
        else {
            panic!("expected trend view");
        };
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].response_time_ms, 300.0);

        let HistoryView::Daily(days) = history(&input, &ApproxTokenEstimator, true).unwrap() else {
            panic!("expected daily view");
        };
        assert_eq!(days.len(), 2);
    }

    #[test]
    fn test_history_rejects_ragged_columns() {
        let input = parse_history(
            r#"{"timestamps": ["2024-03-01T10:00:00Z"], "responseTimes": [],
                "similarities": [0.1], "similarities_with_previous": [null]}"#,
        )
        .unwrap();
        assert!(history(&input, &ApproxTokenEstimator, false).is_err());
    }

    #[test]
    fn test_citations() {
        let found = citations("Source: https://example.com/paper.");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].url, "https://example.com/paper");
    }
}
