// crates/core/src/transcript.rs
//! Reconstructs the human-readable message list of a session.

use crate::types::*;

/// Stand-in text for a tool result inside a user message.
pub const TOOL_RESULT_PLACEHOLDER: &str = "[Tool Result]";

fn user_text(content: &MessageContent) -> String {
    match content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } if !text.is_empty() => Some(text.as_str()),
                ContentBlock::ToolResult { .. } => Some(TOOL_RESULT_PLACEHOLDER),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

fn assistant_entry(event: &Event, assistant: &AssistantMessage) -> Option<TranscriptMessage> {
    let MessageContent::Blocks(blocks) = &assistant.content else {
        return None;
    };

    let mut text = String::new();
    let mut tool_calls = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text: t } => {
                text.push_str(t);
                text.push('\n');
            }
            ContentBlock::ToolUse {
                name: Some(name),
                id,
            } => tool_calls.push(ToolCallRef {
                name: name.clone(),
                id: id.clone().unwrap_or_default(),
            }),
            _ => {}
        }
    }

    let text = text.trim();
    if text.is_empty() && tool_calls.is_empty() {
        return None;
    }

    let content = if text.is_empty() {
        let names: Vec<&str> = tool_calls.iter().map(|t| t.name.as_str()).collect();
        format!("[Used {} tool(s): {}]", tool_calls.len(), names.join(", "))
    } else {
        text.to_string()
    };

    Some(TranscriptMessage {
        role: Role::Assistant,
        content,
        timestamp: event.timestamp,
        model: assistant.model.clone(),
        usage: assistant.usage,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
    })
}

/// Build the display transcript for a session, in file order.
///
/// User turns that only carry tool results are dropped. Assistant turns with
/// neither text nor named tool calls are dropped.
pub fn build_transcript(events: &[Event]) -> Vec<TranscriptMessage> {
    let mut messages = Vec::new();
    for event in events {
        match &event.kind {
            EventKind::User(user) => {
                let text = user_text(&user.content);
                if !text.is_empty() && !text.starts_with(TOOL_RESULT_PLACEHOLDER) {
                    messages.push(TranscriptMessage {
                        role: Role::User,
                        content: text,
                        timestamp: event.timestamp,
                        model: None,
                        usage: None,
                        tool_calls: None,
                    });
                }
            }
            EventKind::Assistant(assistant) => {
                if let Some(entry) = assistant_entry(event, assistant) {
                    messages.push(entry);
                }
            }
            _ => {}
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;
    use pretty_assertions::assert_eq;

    fn transcript(lines: &[&str]) -> Vec<TranscriptMessage> {
        let events: Vec<Event> = lines
            .iter()
            .filter_map(|l| parse_line(l).ok().flatten())
            .collect();
        build_transcript(&events)
    }

    #[test]
    fn test_user_string_and_blocks() {
        let messages = transcript(&[
            r#"{"type":"user","timestamp":"2024-01-01T00:00:00Z","message":{"role":"user","content":"plain"}}"#,
            r#"{"type":"user","message":{"role":"user","content":[{"type":"text","text":"one"},{"type":"text","text":"two"}]}}"#,
        ]);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].content, "plain");
        assert!(messages[0].timestamp.is_some());
        assert_eq!(messages[1].content, "one\ntwo");
    }

    #[test]
    fn test_tool_result_user_turns_dropped() {
        let messages = transcript(&[
            r#"{"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1","content":"output"}]}}"#,
            r#"{"type":"user","message":{"role":"user","content":[{"type":"tool_result","tool_use_id":"t1"},{"type":"text","text":"after"}]}}"#,
            r#"{"type":"user","message":{"role":"user","content":[]}}"#,
        ]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_user_text_before_tool_result_kept() {
        let messages = transcript(&[
            r#"{"type":"user","message":{"role":"user","content":[{"type":"text","text":"see"},{"type":"tool_result","tool_use_id":"t1"}]}}"#,
        ]);
        assert_eq!(messages[0].content, "see\n[Tool Result]");
    }

    #[test]
    fn test_assistant_text_and_tools() {
        let messages = transcript(&[
            r#"{"type":"assistant","message":{"model":"claude-opus-4-6","content":[{"type":"text","text":"  Let me look  "},{"type":"tool_use","id":"t1","name":"Read"}],"usage":{"input_tokens":3,"output_tokens":4}}}"#,
        ]);
        let msg = &messages[0];
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.content, "Let me look");
        assert_eq!(msg.model.as_deref(), Some("claude-opus-4-6"));
        assert_eq!(msg.usage.map(|u| u.output_tokens), Some(4));
        assert_eq!(
            msg.tool_calls,
            Some(vec![ToolCallRef {
                name: "Read".into(),
                id: "t1".into()
            }])
        );
    }

    #[test]
    fn test_assistant_tool_only_fallback_text() {
        let messages = transcript(&[
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"a","name":"Bash"},{"type":"tool_use","name":"Edit"}]}}"#,
        ]);
        assert_eq!(messages[0].content, "[Used 2 tool(s): Bash, Edit]");
        assert_eq!(messages[0].tool_calls.as_ref().unwrap()[1].id, "");
    }

    #[test]
    fn test_empty_assistant_turns_dropped() {
        let messages = transcript(&[
            r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":"..."}]}}"#,
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use","id":"x"}]}}"#,
            r#"{"type":"system","compactMetadata":{}}"#,
        ]);
        assert!(messages.is_empty());
    }

    #[test]
    fn test_serialized_shape() {
        let messages = transcript(&[r#"{"type":"user","message":{"role":"user","content":"hi"}}"#]);
        let json = serde_json::to_value(&messages[0]).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "user", "content": "hi", "timestamp": null})
        );
    }
}
