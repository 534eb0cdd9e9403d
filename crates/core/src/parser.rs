// crates/core/src/parser.rs
//! JSONL decoding for Claude Code session files.
//!
//! Every line is decoded once into a typed [`Event`]. Downstream folds
//! (summaries, reconciliation, search, transcripts) match on [`EventKind`]
//! instead of re-inspecting raw JSON.
//!
//! A malformed line never aborts a file: [`read_events`] logs it at debug
//! level and moves on. Only failures to open or read the file itself are
//! reported as [`ParseError`].

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::error::{EventError, ParseError};
use crate::types::*;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawLine {
    #[serde(rename = "type")]
    entry_type: String,
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    cwd: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    git_branch: Option<String>,
    #[serde(default)]
    message: Option<RawMessage>,
    #[serde(default)]
    compact_metadata: Option<serde::de::IgnoredAny>,
    #[serde(default)]
    microcompact_metadata: Option<RawMicrocompact>,
}

#[derive(Debug, Deserialize)]
struct RawMessage {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    content: MessageContent,
    #[serde(default)]
    usage: Option<RawUsage>,
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    #[serde(default)]
    input_tokens: Option<u64>,
    #[serde(default)]
    output_tokens: Option<u64>,
    #[serde(default)]
    cache_creation_input_tokens: Option<u64>,
    #[serde(default)]
    cache_read_input_tokens: Option<u64>,
}

impl From<RawUsage> for TokenUsage {
    fn from(raw: RawUsage) -> Self {
        TokenUsage {
            input_tokens: raw.input_tokens.unwrap_or(0),
            output_tokens: raw.output_tokens.unwrap_or(0),
            cache_read_tokens: raw.cache_read_input_tokens.unwrap_or(0),
            cache_write_tokens: raw.cache_creation_input_tokens.unwrap_or(0),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMicrocompact {
    #[serde(default)]
    tokens_saved: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    compacted_tool_ids: Vec<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// Parse an RFC 3339 timestamp. Unparseable values are treated as absent.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Decode a single log line.
///
/// Returns `Ok(None)` for empty or whitespace-only lines. A line that is not
/// JSON, or is JSON without a string `type` discriminant, is an error the
/// caller is expected to skip.
pub fn parse_line(line: &str) -> Result<Option<Event>, EventError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let raw: RawLine = serde_json::from_str(line)?;
    if raw.entry_type.is_empty() {
        return Err(EventError::UnknownShape("empty type field".to_string()));
    }

    let kind = match raw.entry_type.as_str() {
        "user" => EventKind::User(match raw.message {
            Some(m) => UserMessage {
                role: non_empty(m.role),
                content: m.content,
            },
            None => UserMessage::default(),
        }),
        "assistant" => {
            let message = raw.message;
            EventKind::Assistant(match message {
                Some(m) => AssistantMessage {
                    model: non_empty(m.model),
                    content: m.content,
                    usage: m.usage.map(TokenUsage::from),
                },
                None => AssistantMessage::default(),
            })
        }
        "system" => {
            if let Some(micro) = raw.microcompact_metadata {
                EventKind::Microcompaction(Microcompaction {
                    tokens_saved: micro.tokens_saved.unwrap_or(0),
                    compacted_tool_ids: micro.compacted_tool_ids,
                })
            } else if raw.compact_metadata.is_some() {
                EventKind::Compaction
            } else {
                EventKind::Other
            }
        }
        _ => EventKind::Other,
    };

    Ok(Some(Event {
        session_id: non_empty(raw.session_id),
        timestamp: raw.timestamp.as_deref().and_then(parse_timestamp),
        cwd: non_empty(raw.cwd),
        version: non_empty(raw.version),
        git_branch: non_empty(raw.git_branch),
        kind,
    }))
}

/// Read every decodable event from a session file, in file order.
///
/// Malformed lines and lines that are not valid UTF-8 are skipped.
///
/// # Errors
/// - `ParseError::NotFound` if the file doesn't exist
/// - `ParseError::PermissionDenied` if the file can't be read
/// - `ParseError::Io` for other I/O errors, including failures mid-file
pub async fn read_events(file_path: &Path) -> Result<Vec<Event>, ParseError> {
    let file = File::open(file_path)
        .await
        .map_err(|e| ParseError::io(file_path, e))?;

    let mut segments = BufReader::new(file).split(b'\n');
    let mut events = Vec::new();
    let mut line_number: usize = 0;

    while let Some(bytes) = segments
        .next_segment()
        .await
        .map_err(|e| ParseError::io(file_path, e))?
    {
        line_number += 1;

        let Ok(line) = std::str::from_utf8(&bytes) else {
            debug!(
                "Skipping invalid UTF-8 at line {} in {:?}",
                line_number, file_path
            );
            continue;
        };

        match parse_line(line) {
            Ok(Some(event)) => events.push(event),
            Ok(None) => {}
            Err(e) => {
                debug!(
                    "Skipping malformed line {} in {:?}: {}",
                    line_number, file_path, e
                );
            }
        }
    }

    Ok(events)
}

/// Plain text fragments a full-text search should look at.
///
/// User messages contribute their string content or text blocks, assistant
/// messages their text blocks. Tool results, tool calls and thinking are
/// never searched.
pub fn searchable_text(event: &Event) -> Vec<&str> {
    match &event.kind {
        EventKind::User(user) => user.content.text_parts(),
        EventKind::Assistant(assistant) => match &assistant.content {
            MessageContent::Blocks(_) => assistant.content.text_parts(),
            MessageContent::Text(_) => Vec::new(),
        },
        _ => Vec::new(),
    }
}
