//! Chat message normalization
//!
//! Captured requests keep each platform's message shape: OpenAI string content,
//! Anthropic content blocks, or Gemini `parts`. These helpers flatten all of them into
//! plain role/text pairs for display.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    /// Map a platform role name. Unknown roles are treated as the user.
    pub fn from_platform(role: &str) -> Self {
        match role.to_lowercase().as_str() {
            "model" | "assistant" => ChatRole::Assistant,
            "system" => ChatRole::System,
            _ => ChatRole::User,
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatRole::System => write!(f, "system"),
            ChatRole::User => write!(f, "user"),
            ChatRole::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Flatten a captured `messages` array. Anything that is not an array yields no messages.
pub fn normalize_messages(messages: &Value) -> Vec<ChatMessage> {
    let Some(messages) = messages.as_array() else {
        return Vec::new();
    };

    messages.iter().map(normalize_message).collect()
}

fn normalize_message(message: &Value) -> ChatMessage {
    let role = ChatRole::from_platform(message.get("role").and_then(Value::as_str).unwrap_or(""));

    let parts = message.get("parts").filter(|parts| is_truthy(parts));
    let content = message.get("content").filter(|content| is_truthy(content));

    let content = match (parts, content) {
        (Some(parts), None) => gemini_parts_text(parts),
        _ => content_blocks_text(message.get("content").unwrap_or(&Value::Null)),
    };

    ChatMessage { role, content }
}

/// `parts: [{ "text": ... }]`
fn gemini_parts_text(parts: &Value) -> String {
    match parts.as_array() {
        Some(parts) => join_text(parts.iter().filter_map(|part| part.get("text")?.as_str())),
        None => value_text(parts),
    }
}

/// String content, or `[{ "type": "text", "text": ... }]` blocks
fn content_blocks_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => join_text(blocks.iter().filter_map(|block| {
            if block.get("type").and_then(Value::as_str) == Some("text") {
                block.get("text")?.as_str()
            } else {
                None
            }
        })),
        other => value_text(other),
    }
}

fn join_text<'a>(texts: impl Iterator<Item = &'a str>) -> String {
    texts.collect::<Vec<_>>().join("\n")
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Empty strings, zero, false and null count as absent
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(role: ChatRole, content: &str) -> ChatMessage {
        ChatMessage {
            role,
            content: content.to_string(),
        }
    }

    #[test]
    fn test_non_array_input() {
        assert!(normalize_messages(&Value::Null).is_empty());
        assert!(normalize_messages(&json!({"role": "user"})).is_empty());
        assert!(normalize_messages(&json!("hello")).is_empty());
    }

    #[test]
    fn test_role_mapping() {
        assert_eq!(ChatRole::from_platform("MODEL"), ChatRole::Assistant);
        assert_eq!(ChatRole::from_platform("Assistant"), ChatRole::Assistant);
        assert_eq!(ChatRole::from_platform("system"), ChatRole::System);
        assert_eq!(ChatRole::from_platform("tool"), ChatRole::User);
        assert_eq!(ChatRole::from_platform(""), ChatRole::User);

        let normalized = normalize_messages(&json!([{"content": "no role"}, {"role": 3}]));
        assert_eq!(normalized[0].role, ChatRole::User);
        assert_eq!(normalized[1], message(ChatRole::User, ""));
    }

    #[test]
    fn test_openai_and_anthropic_shapes() {
        let normalized = normalize_messages(&json!([
            {"role": "system", "content": "be brief"},
            {"role": "user", "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "source": {"data": "..."}},
                {"type": "text", "text": "second"},
                {"type": "text", "text": 5}
            ]},
            {"role": "assistant", "content": null},
            {"role": "assistant", "content": 42}
        ]));

        assert_eq!(
            normalized,
            vec![
                message(ChatRole::System, "be brief"),
                message(ChatRole::User, "first\nsecond"),
                message(ChatRole::Assistant, ""),
                message(ChatRole::Assistant, "42"),
            ]
        );
    }

    #[test]
    fn test_gemini_shape() {
        let normalized = normalize_messages(&json!([
            {"role": "user", "parts": [{"text": "one"}, {"inline_data": {}}, {"text": "two"}]},
            {"role": "model", "parts": "plain"},
            {"role": "model", "parts": [{"text": "ignored"}], "content": "wins"},
            {"role": "user", "parts": [{"text": "empty content"}], "content": ""}
        ]));

        assert_eq!(
            normalized,
            vec![
                message(ChatRole::User, "one\ntwo"),
                message(ChatRole::Assistant, "plain"),
                message(ChatRole::Assistant, "wins"),
                message(ChatRole::User, "empty content"),
            ]
        );
    }
}
