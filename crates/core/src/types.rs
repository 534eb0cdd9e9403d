// crates/core/src/types.rs
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Token counts reported by one assistant turn, or summed across many.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_read_tokens += other.cache_read_tokens;
        self.cache_write_tokens += other.cache_write_tokens;
    }
}

// ============================================================================
// Events (one decoded JSONL line)
// ============================================================================

/// One decoded line of a session file.
///
/// Fields shared by every line type live here; the variant-specific payload
/// is in [`kind`](Event::kind).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub session_id: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
    pub cwd: Option<String>,
    pub version: Option<String>,
    pub git_branch: Option<String>,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    User(UserMessage),
    Assistant(AssistantMessage),
    /// Full context compaction.
    Compaction,
    /// Partial compaction of older tool results.
    Microcompaction(Microcompaction),
    /// Progress, snapshots, summaries and anything not yet understood.
    Other,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserMessage {
    /// `message.role`, when present.
    pub role: Option<String>,
    pub content: MessageContent,
}

impl UserMessage {
    /// True for turns typed by the user, as opposed to `user` lines that
    /// carry some other role.
    pub fn is_from_user(&self) -> bool {
        self.role.as_deref() == Some("user")
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssistantMessage {
    pub model: Option<String>,
    pub content: MessageContent,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Microcompaction {
    pub tokens_saved: u64,
    pub compacted_tool_ids: Vec<String>,
}

/// Message content is either a bare string or a list of typed blocks.
///
/// Decoding never fails on a well-formed JSON value: blocks that don't match
/// a known shape become [`ContentBlock::Other`], and anything that is neither
/// a string nor an array is empty content.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl<'de> Deserialize<'de> for MessageContent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::String(text) => MessageContent::Text(text),
            serde_json::Value::Array(values) => MessageContent::Blocks(
                values
                    .into_iter()
                    .map(|value| ContentBlock::deserialize(value).unwrap_or(ContentBlock::Other))
                    .collect(),
            ),
            _ => MessageContent::default(),
        })
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

impl MessageContent {
    /// Text blocks (or the bare string), in order. Tool results, tool calls
    /// and thinking are not part of the plain text.
    pub fn text_parts(&self) -> Vec<&str> {
        match self {
            MessageContent::Text(text) => vec![text.as_str()],
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn tool_uses(&self) -> impl Iterator<Item = (Option<&str>, Option<&str>)> {
        let blocks: &[ContentBlock] = match self {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        };
        blocks.iter().filter_map(|block| match block {
            ContentBlock::ToolUse { name, id } => Some((name.as_deref(), id.as_deref())),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        #[serde(default, deserialize_with = "null_as_default")]
        text: String,
    },
    Thinking {
        #[serde(default, deserialize_with = "null_as_default")]
        thinking: String,
    },
    ToolUse {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        id: Option<String>,
    },
    ToolResult {
        #[serde(default)]
        tool_use_id: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// Deserialize `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Derived views
// ============================================================================

/// Compaction statistics for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompactionInfo {
    pub compactions: u64,
    pub microcompactions: u64,
    pub total_tokens_saved: u64,
    pub compaction_timestamps: Vec<DateTime<Utc>>,
}

/// Fixed-shape summary of one session file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub project_id: String,
    pub project_name: String,
    /// First timestamp seen in the file.
    pub timestamp: Option<DateTime<Utc>>,
    /// Milliseconds between the first and last timestamp.
    pub duration: i64,
    pub message_count: u64,
    pub user_message_count: u64,
    pub assistant_message_count: u64,
    pub tool_call_count: u64,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cache_read_tokens: u64,
    pub total_cache_write_tokens: u64,
    pub estimated_cost: f64,
    pub model: String,
    pub models: Vec<String>,
    pub git_branch: String,
    pub cwd: String,
    pub version: String,
    pub tools_used: BTreeMap<String, u64>,
    pub compaction: CompactionInfo,
}

impl SessionInfo {
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens
            + self.total_output_tokens
            + self.total_cache_read_tokens
            + self.total_cache_write_tokens
    }
}

/// Sort sessions newest first; sessions without any timestamp go last.
pub fn sort_newest_first(sessions: &mut [SessionInfo]) {
    sessions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
}

/// Per-project rollup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub id: String,
    pub name: String,
    pub path: String,
    pub session_count: usize,
    pub total_messages: u64,
    pub total_tokens: u64,
    pub estimated_cost: f64,
    pub last_active: Option<DateTime<Utc>>,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCallRef {
    pub name: String,
    pub id: String,
}

/// One entry of a reconstructed transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallRef>>,
}

/// Session summary plus its full transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDetail {
    #[serde(flatten)]
    pub info: SessionInfo,
    pub messages: Vec<TranscriptMessage>,
}
