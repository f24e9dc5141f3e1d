//! Chat transcripts and the statistics derived from them.
//!
//! A chat is an ordered list of user and assistant messages. Every adjacent
//! `(user, assistant)` pair is one interaction; other adjacencies (two user
//! messages in a row, an assistant greeting) are skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::similarity::similarity;
use crate::stats::{link_previous, InteractionRecord, Mean};
use crate::tokens::TokenEstimator;

/// Title length limit, in UTF-16 code units like `estimate_tokens_approx`.
const TITLE_MAX_UNITS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Metrics stored alongside an assistant message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageStats {
    pub cosine_similarity: Option<f64>,
    pub response_time_ms: Option<i64>,
    pub tokens_used: Option<usize>,
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    pub processing_time_ms: Option<i64>,
}

impl MessageStats {
    /// Stats for an assistant reply to `user_message`.
    ///
    /// `requested_at` is the user message timestamp, `started_at` and
    /// `finished_at` bracket response generation.
    pub fn for_response(
        user_message: &str,
        response: &str,
        requested_at: DateTime<Utc>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        estimator: &dyn TokenEstimator,
    ) -> Self {
        let usage = estimator.usage(user_message, response);
        Self {
            cosine_similarity: Some(similarity(user_message, response)),
            response_time_ms: Some((finished_at - requested_at).num_milliseconds()),
            tokens_used: Some(usage.total_tokens),
            prompt_tokens: Some(usage.prompt_tokens),
            completion_tokens: Some(usage.completion_tokens),
            processing_time_ms: Some((finished_at - started_at).num_milliseconds()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<MessageStats>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            content: content.into(),
            role,
            timestamp,
            stats: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(alias = "_id")]
    pub id: String,
    pub persona_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    /// Adjacent `(user, assistant)` message pairs, in transcript order.
    pub fn exchanges(&self) -> impl Iterator<Item = (&ChatMessage, &ChatMessage)> {
        exchanges(&self.messages)
    }
}

/// Adjacent `(user, assistant)` message pairs, in transcript order.
pub fn exchanges(
    messages: &[ChatMessage],
) -> impl Iterator<Item = (&ChatMessage, &ChatMessage)> {
    messages.windows(2).filter_map(|pair| match pair {
        [user, reply] if user.role == Role::User && reply.role == Role::Assistant => {
            Some((user, reply))
        }
        _ => None,
    })
}

/// Turn a transcript into interaction records, with each record's
/// similarity to the previous response filled in.
pub fn interactions_from_messages(
    messages: &[ChatMessage],
    estimator: &dyn TokenEstimator,
) -> Vec<InteractionRecord> {
    let mut records: Vec<InteractionRecord> = exchanges(messages)
        .map(|(user, reply)| {
            InteractionRecord::from_exchange(
                user.content.as_str(),
                user.timestamp,
                reply.content.as_str(),
                reply.timestamp,
                estimator,
            )
        })
        .collect();
    link_previous(&mut records);
    records
}

/// Title for a chat: the first user message, cut to 30 UTF-16 units.
///
/// A character that would straddle the limit is dropped whole.
pub fn derive_title(messages: &[ChatMessage]) -> Option<String> {
    let first = messages.iter().find(|m| m.role == Role::User)?;
    let content = first.content.as_str();
    if content.encode_utf16().count() <= TITLE_MAX_UNITS {
        return Some(content.to_string());
    }

    let mut units = 0;
    let head: String = content
        .chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= TITLE_MAX_UNITS
        })
        .collect();
    Some(format!("{head}..."))
}

/// Fill in `stats` for assistant replies that answer a user message but
/// carry none. Generation start is unknown, so it is taken as the request
/// time. Returns how many replies were filled.
pub fn backfill_stats(messages: &mut [ChatMessage], estimator: &dyn TokenEstimator) -> usize {
    let mut filled = 0;
    for i in 1..messages.len() {
        let (head, tail) = messages.split_at_mut(i);
        let (user, reply) = (&head[i - 1], &mut tail[0]);
        if user.role != Role::User || reply.role != Role::Assistant || reply.stats.is_some() {
            continue;
        }
        reply.stats = Some(MessageStats::for_response(
            &user.content,
            &reply.content,
            user.timestamp,
            user.timestamp,
            reply.timestamp,
            estimator,
        ));
        filled += 1;
    }
    filled
}

/// Chat-level figures, averaged over assistant messages that carry a stored
/// similarity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatStats {
    pub total_messages: usize,
    pub avg_cosine_similarity: Option<f64>,
    pub avg_response_time_ms: Option<f64>,
}

impl ChatStats {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        let scored: Vec<&MessageStats> = messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .filter_map(|m| m.stats.as_ref())
            .filter(|s| s.cosine_similarity.is_some())
            .collect();

        let scores: Mean = scored
            .iter()
            .map(|s| s.cosine_similarity.unwrap_or_default())
            .collect();
        // Missing response times count as zero within the scored set.
        let response_time: Mean = scored
            .iter()
            .map(|s| s.response_time_ms.unwrap_or_default() as f64)
            .collect();

        Self {
            total_messages: messages.len(),
            avg_cosine_similarity: scores.value(),
            avg_response_time_ms: response_time.value(),
        }
    }

    pub fn from_chat(chat: &Chat) -> Self {
        Self::from_messages(&chat.messages)
    }
}

/// Dashboard figures for one persona across all of its chats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaStats {
    pub total_chats: usize,
    pub total_messages: usize,
    /// Mean input/response similarity over every exchange.
    pub avg_cosine_similarity: Option<f64>,
    /// Mean over exchanges with a strictly positive response time; clock
    /// skew and zero-latency stubs are left out.
    pub avg_response_time: Option<f64>,
    pub last_active: DateTime<Utc>,
}

impl PersonaStats {
    /// `persona_updated_at` seeds `last_active`; any later chat update wins.
    pub fn from_chats(chats: &[Chat], persona_updated_at: DateTime<Utc>) -> Self {
        let mut scores = Mean::default();
        let mut response_time = Mean::default();
        let mut total_messages = 0;
        let mut last_active = persona_updated_at;

        for chat in chats {
            total_messages += chat.messages.len();
            last_active = last_active.max(chat.updated_at);

            for (user, reply) in chat.exchanges() {
                let elapsed = (reply.timestamp - user.timestamp).num_milliseconds();
                if elapsed > 0 {
                    response_time.push(elapsed as f64);
                }
                scores.push(similarity(&user.content, &reply.content));
            }
        }

        log::debug!(
            "persona stats over {} chats, {} exchanges",
            chats.len(),
            scores.count()
        );

        Self {
            total_chats: chats.len(),
            total_messages,
            avg_cosine_similarity: scores.value(),
            avg_response_time: response_time.value(),
            last_active,
        }
    }
}
