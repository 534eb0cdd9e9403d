// crates/core/src/accumulator.rs
//! Session summarizer.
//!
//! `SessionAccumulator` folds the ordered events of one session file into a
//! [`SessionInfo`]. Feed events via
//! [`process_event`](SessionAccumulator::process_event), then call
//! [`finish`](SessionAccumulator::finish).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::ParseError;
use crate::parser::read_events;
use crate::pricing::PricingTable;
use crate::types::*;

/// Bucket for tool calls whose block carries no name.
pub const UNKNOWN_TOOL: &str = "unknown";

/// Reported as the primary model when no assistant event named one.
pub const UNKNOWN_MODEL: &str = "unknown";

/// Running totals for one session.
#[derive(Debug, Default)]
pub struct SessionAccumulator {
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub git_branch: Option<String>,
    pub cwd: Option<String>,
    pub version: Option<String>,
    pub user_messages: u64,
    pub assistant_messages: u64,
    pub tool_calls: u64,
    pub tokens: TokenUsage,
    pub estimated_cost: f64,
    pub models: Vec<String>,
    pub tools_used: BTreeMap<String, u64>,
    pub compaction: CompactionInfo,
}

fn keep_first(slot: &mut Option<String>, value: &Option<String>) {
    if slot.is_none() {
        if let Some(v) = value.as_ref().filter(|v| !v.is_empty()) {
            *slot = Some(v.clone());
        }
    }
}

impl SessionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process_event(&mut self, event: &Event, pricing: &PricingTable) {
        if let Some(ts) = event.timestamp {
            if self.first_timestamp.is_none() {
                self.first_timestamp = Some(ts);
            }
            self.last_timestamp = Some(ts);
        }

        keep_first(&mut self.git_branch, &event.git_branch);
        keep_first(&mut self.cwd, &event.cwd);
        keep_first(&mut self.version, &event.version);

        match &event.kind {
            EventKind::User(user) if user.is_from_user() => self.user_messages += 1,
            EventKind::User(_) => {}
            EventKind::Assistant(assistant) => self.process_assistant(assistant, pricing),
            EventKind::Compaction => {
                self.compaction.compactions += 1;
                self.push_compaction_timestamp(event.timestamp);
            }
            EventKind::Microcompaction(micro) => {
                self.compaction.microcompactions += 1;
                self.compaction.total_tokens_saved += micro.tokens_saved;
                self.push_compaction_timestamp(event.timestamp);
            }
            EventKind::Other => {}
        }
    }

    fn process_assistant(&mut self, assistant: &AssistantMessage, pricing: &PricingTable) {
        self.assistant_messages += 1;

        if let Some(model) = &assistant.model {
            if !self.models.iter().any(|m| m == model) {
                self.models.push(model.clone());
            }
        }

        if let Some(usage) = &assistant.usage {
            self.tokens.add(usage);
            self.estimated_cost += pricing.cost(assistant.model.as_deref().unwrap_or(""), usage);
        }

        for (name, _) in assistant.content.tool_uses() {
            self.tool_calls += 1;
            *self
                .tools_used
                .entry(name.unwrap_or(UNKNOWN_TOOL).to_string())
                .or_insert(0) += 1;
        }
    }

    fn push_compaction_timestamp(&mut self, timestamp: Option<DateTime<Utc>>) {
        if let Some(ts) = timestamp {
            self.compaction.compaction_timestamps.push(ts);
        }
    }

    /// Milliseconds between first and last timestamp, never negative.
    pub fn duration_ms(&self) -> i64 {
        match (self.first_timestamp, self.last_timestamp) {
            (Some(first), Some(last)) => (last - first).num_milliseconds().max(0),
            _ => 0,
        }
    }

    pub fn finish(self, session_id: &str, project_id: &str, project_name: &str) -> SessionInfo {
        let duration = self.duration_ms();
        SessionInfo {
            id: session_id.to_string(),
            project_id: project_id.to_string(),
            project_name: project_name.to_string(),
            timestamp: self.first_timestamp,
            duration,
            message_count: self.user_messages + self.assistant_messages,
            user_message_count: self.user_messages,
            assistant_message_count: self.assistant_messages,
            tool_call_count: self.tool_calls,
            total_input_tokens: self.tokens.input_tokens,
            total_output_tokens: self.tokens.output_tokens,
            total_cache_read_tokens: self.tokens.cache_read_tokens,
            total_cache_write_tokens: self.tokens.cache_write_tokens,
            estimated_cost: self.estimated_cost,
            model: self
                .models
                .first()
                .cloned()
                .unwrap_or_else(|| UNKNOWN_MODEL.to_string()),
            models: self.models,
            git_branch: self.git_branch.unwrap_or_default(),
            cwd: self.cwd.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            tools_used: self.tools_used,
            compaction: self.compaction,
        }
    }
}

/// Summarize an already-decoded event sequence.
pub fn summarize_events(
    events: &[Event],
    session_id: &str,
    project_id: &str,
    project_name: &str,
    pricing: &PricingTable,
) -> SessionInfo {
    let mut acc = SessionAccumulator::new();
    for event in events {
        acc.process_event(event, pricing);
    }
    acc.finish(session_id, project_id, project_name)
}

/// Read and summarize one session file. The session id is the file stem.
pub async fn summarize_file(
    path: &Path,
    project_id: &str,
    project_name: &str,
    pricing: &PricingTable,
) -> Result<SessionInfo, ParseError> {
    let events = read_events(path).await?;
    let session_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(summarize_events(
        &events,
        &session_id,
        project_id,
        project_name,
        pricing,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn events(lines: &[&str]) -> Vec<Event> {
        lines
            .iter()
            .filter_map(|l| parse_line(l).ok().flatten())
            .collect()
    }

    fn summarize(lines: &[&str]) -> SessionInfo {
        summarize_events(&events(lines), "s1", "-repo", "repo", &PricingTable::default())
    }

    const USER_1: &str = r#"{"type":"user","timestamp":"2024-03-01T10:00:00Z","gitBranch":"","cwd":"/repo","version":"1.0.0","message":{"role":"user","content":"Fix the bug"}}"#;
    const ASSISTANT_1: &str = r#"{"type":"assistant","timestamp":"2024-03-01T10:00:05Z","gitBranch":"main","cwd":"/other","message":{"model":"claude-sonnet-4-6","content":[{"type":"text","text":"On it"},{"type":"tool_use","id":"t1","name":"Read"},{"type":"tool_use","id":"t2","name":"Read"},{"type":"tool_use","id":"t3"}],"usage":{"input_tokens":1000,"output_tokens":200,"cache_creation_input_tokens":50,"cache_read_input_tokens":400}}}"#;
    const ASSISTANT_2: &str = r#"{"type":"assistant","timestamp":"2024-03-01T10:01:00Z","gitBranch":"feature","message":{"model":"claude-opus-4-6","content":[{"type":"text","text":"Done"}],"usage":{"input_tokens":10,"output_tokens":20}}}"#;
    const COMPACT: &str = r#"{"type":"system","timestamp":"2024-03-01T10:00:30Z","compactMetadata":{"trigger":"auto"}}"#;
    const MICRO: &str = r#"{"type":"system","timestamp":"2024-03-01T10:00:40Z","microcompactMetadata":{"tokensSaved":700,"compactedToolIds":["t1"]}}"#;

    #[test]
    fn test_full_session_summary() {
        let info = summarize(&[USER_1, ASSISTANT_1, COMPACT, MICRO, ASSISTANT_2]);

        assert_eq!(info.id, "s1");
        assert_eq!(info.project_id, "-repo");
        assert_eq!(info.project_name, "repo");
        assert_eq!(info.timestamp, Some("2024-03-01T10:00:00Z".parse().unwrap()));
        assert_eq!(info.duration, 60_000);
        assert_eq!(info.user_message_count, 1);
        assert_eq!(info.assistant_message_count, 2);
        assert_eq!(info.message_count, 3);
        assert_eq!(info.tool_call_count, 3);
        assert_eq!(info.total_input_tokens, 1010);
        assert_eq!(info.total_output_tokens, 220);
        assert_eq!(info.total_cache_write_tokens, 50);
        assert_eq!(info.total_cache_read_tokens, 400);
        assert_eq!(info.model, "claude-sonnet-4-6");
        assert_eq!(info.models, vec!["claude-sonnet-4-6", "claude-opus-4-6"]);
        // Empty branch on the first line doesn't count as "seen".
        assert_eq!(info.git_branch, "main");
        assert_eq!(info.cwd, "/repo");
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.tools_used.get("Read"), Some(&2));
        assert_eq!(info.tools_used.get(UNKNOWN_TOOL), Some(&1));
        assert_eq!(info.compaction.compactions, 1);
        assert_eq!(info.compaction.microcompactions, 1);
        assert_eq!(info.compaction.total_tokens_saved, 700);
        assert_eq!(info.compaction.compaction_timestamps.len(), 2);
    }

    #[test]
    fn test_cost_is_sum_over_assistant_events() {
        let pricing = PricingTable::default();
        let info = summarize(&[ASSISTANT_1, ASSISTANT_2]);

        let first = pricing.cost(
            "claude-sonnet-4-6",
            &TokenUsage {
                input_tokens: 1000,
                output_tokens: 200,
                cache_read_tokens: 400,
                cache_write_tokens: 50,
            },
        );
        let second = pricing.cost(
            "claude-opus-4-6",
            &TokenUsage {
                input_tokens: 10,
                output_tokens: 20,
                ..Default::default()
            },
        );
        assert!((info.estimated_cost - (first + second)).abs() < 1e-12);
    }

    #[test]
    fn test_single_event_duration_is_zero() {
        let info = summarize(&[USER_1]);
        assert_eq!(info.duration, 0);
    }

    #[test]
    fn test_untimed_session_duration_is_zero() {
        let info = summarize(&[
            r#"{"type":"user","message":{"role":"user","content":"hi"}}"#,
            r#"{"type":"assistant","message":{"content":"hello"}}"#,
        ]);
        assert_eq!(info.duration, 0);
        assert!(info.timestamp.is_none());
        assert_eq!(info.model, UNKNOWN_MODEL);
        assert!(info.models.is_empty());
    }

    #[test]
    fn test_out_of_order_timestamps_clamp_to_zero() {
        let info = summarize(&[
            r#"{"type":"user","timestamp":"2024-03-01T10:05:00Z"}"#,
            r#"{"type":"user","timestamp":"2024-03-01T10:00:00Z"}"#,
        ]);
        assert_eq!(info.duration, 0);
    }

    #[test]
    fn test_malformed_lines_do_not_change_summary() {
        let clean = summarize(&[USER_1, ASSISTANT_1, ASSISTANT_2]);
        let noisy = summarize(&[
            "not json",
            USER_1,
            r#"{"missing":"type"}"#,
            ASSISTANT_1,
            "{{{",
            ASSISTANT_2,
            "",
        ]);
        assert_eq!(clean, noisy);
    }

    #[test]
    fn test_compaction_without_timestamp_not_in_timeline() {
        let info = summarize(&[r#"{"type":"system","compactMetadata":{}}"#]);
        assert_eq!(info.compaction.compactions, 1);
        assert!(info.compaction.compaction_timestamps.is_empty());
    }

    #[test]
    fn test_unusual_content_block_still_counts() {
        let info = summarize(&[
            r#"{"type":"user","timestamp":"2024-03-01T10:00:00Z","message":{"role":"user","content":[{"type":"text","text":null}]}}"#,
            r#"{"type":"assistant","timestamp":"2024-03-01T10:00:05Z","message":{"model":"claude-opus-4-6","content":[{"text":"untyped"},{"type":"tool_use","name":"Bash"}],"usage":{"input_tokens":1000000}}}"#,
        ]);
        assert_eq!(info.user_message_count, 1);
        assert_eq!(info.assistant_message_count, 1);
        assert_eq!(info.total_input_tokens, 1_000_000);
        assert!(info.estimated_cost > 0.0);
        assert_eq!(info.tool_call_count, 1);
    }

    #[test]
    fn test_user_lines_without_user_role_are_not_counted() {
        let info = summarize(&[
            USER_1,
            r#"{"type":"user","message":{"role":"system","content":"injected"}}"#,
            r#"{"type":"user","timestamp":"2024-03-01T10:00:10Z"}"#,
        ]);
        assert_eq!(info.user_message_count, 1);
        assert_eq!(info.message_count, 1);
    }

    #[tokio::test]
    async fn test_summarize_file_uses_file_stem() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("abc-123.jsonl");
        std::fs::write(&path, format!("{}\n{}\n", USER_1, ASSISTANT_2)).unwrap();

        let info = summarize_file(&path, "-repo", "repo", &PricingTable::default())
            .await
            .unwrap();
        assert_eq!(info.id, "abc-123");
        assert_eq!(info.message_count, 2);
    }
}
