use anyhow::{Context, Result};
use common::conversation::{Chat, ChatMessage};
use common::history::AnalyticsHistory;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Read the whole input document from `path`, or from stdin when absent.
pub fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}

pub fn parse_json(raw: &str) -> Result<serde_json::Value> {
    serde_json::from_str(raw).context("input is not valid JSON")
}

/// A single chat document or a bare list of messages.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Transcript {
    Chat(Chat),
    Messages(Vec<ChatMessage>),
}

impl Transcript {
    pub fn messages(&self) -> &[ChatMessage] {
        match self {
            Transcript::Chat(chat) => &chat.messages,
            Transcript::Messages(messages) => messages,
        }
    }

    pub fn messages_mut(&mut self) -> &mut [ChatMessage] {
        match self {
            Transcript::Chat(chat) => &mut chat.messages,
            Transcript::Messages(messages) => messages,
        }
    }
}

/// History columns as stored by the analytics backend, or a transcript to
/// derive them from.
#[derive(Debug)]
pub enum HistoryInput {
    Columns(AnalyticsHistory),
    Transcript(Transcript),
}

pub fn parse_transcript(raw: &str) -> Result<Transcript> {
    let transcript: Transcript = serde_json::from_str(raw)
        .context("expected a chat object or an array of messages")?;
    debug!(messages = transcript.messages().len(), "parsed transcript");
    Ok(transcript)
}

pub fn parse_chats(raw: &str) -> Result<Vec<Chat>> {
    let chats: Vec<Chat> = serde_json::from_str(raw).context("expected an array of chats")?;
    debug!(chats = chats.len(), "parsed chats");
    Ok(chats)
}

/// An object with a `timestamps` key is history columns and reports its own
/// parse error; anything else is read as a transcript.
pub fn parse_history(raw: &str) -> Result<HistoryInput> {
    let value = parse_json(raw)?;
    if value.get("timestamps").is_some() {
        let history: AnalyticsHistory =
            serde_json::from_value(value).context("invalid history columns")?;
        debug!(entries = history.len(), "parsed history columns");
        return Ok(HistoryInput::Columns(history));
    }
    let transcript: Transcript = serde_json::from_value(value)
        .context("expected history columns, a chat object, or an array of messages")?;
    debug!(messages = transcript.messages().len(), "parsed history transcript");
    Ok(HistoryInput::Transcript(transcript))
}
