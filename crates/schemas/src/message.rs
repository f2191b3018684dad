// Message types
//
// Message is a store-agnostic type that represents
// a single turn in a conversation thread.
//
// Content is stored as Vec<ContentPart> so text and structured
// tool payloads share one representation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Message role in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// System message (instructions)
    System,
    /// User message
    User,
    /// Assistant response (may contain tool calls in content)
    Assistant,
    /// Tool execution result
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

impl From<&str> for MessageRole {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "system" => MessageRole::System,
            "user" => MessageRole::User,
            "assistant" | "agent" => MessageRole::Assistant,
            "tool" | "tool_result" => MessageRole::Tool,
            _ => MessageRole::User,
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
    pub created_at: DateTime<Utc>,
}

// ============================================
// Content Part Structs
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextContentPart {
    pub text: String,
}

impl TextContentPart {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImageContentPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl ImageContentPart {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            base64: None,
            media_type: None,
        }
    }

    pub fn from_base64(base64: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            url: None,
            base64: Some(base64.into()),
            media_type: Some(media_type.into()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallContentPart {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

impl ToolCallContentPart {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResultContentPart {
    pub tool_call_id: String,
    /// `Some(Value::Null)` is kept distinct from a missing result
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl ToolResultContentPart {
    pub fn new(
        tool_call_id: impl Into<String>,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Self {
        Self {
            tool_call_id: tool_call_id.into(),
            result,
            error,
        }
    }

    pub fn success(tool_call_id: impl Into<String>, result: serde_json::Value) -> Self {
        Self::new(tool_call_id, Some(result), None)
    }

    pub fn error(tool_call_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self::new(tool_call_id, None, Some(error.into()))
    }
}

// ============================================
// Content Part Enum
// ============================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text(TextContentPart),
    Image(ImageContentPart),
    ToolCall(ToolCallContentPart),
    ToolResult(ToolResultContentPart),
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text(TextContentPart::new(text))
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        ContentPart::Image(ImageContentPart::from_url(url))
    }

    pub fn tool_call(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        ContentPart::ToolCall(ToolCallContentPart::new(id, name, arguments))
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Self {
        ContentPart::ToolResult(ToolResultContentPart::new(tool_call_id, result, error))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text(t) => Some(&t.text),
            _ => None,
        }
    }
}

impl Message {
    /// Create a message with an arbitrary role and content parts
    pub fn new(role: MessageRole, content: Vec<ContentPart>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content,
            author_name: None,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, vec![ContentPart::text(content)])
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, vec![ContentPart::text(content)])
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, vec![ContentPart::text(content)])
    }

    pub fn assistant_with_tools(
        content: impl Into<String>,
        tool_calls: Vec<ToolCallContentPart>,
    ) -> Self {
        let mut parts = vec![ContentPart::text(content)];
        parts.extend(tool_calls.into_iter().map(ContentPart::ToolCall));
        Self::new(MessageRole::Assistant, parts)
    }

    pub fn tool_result(
        tool_call_id: impl Into<String>,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> Self {
        Self::new(
            MessageRole::Tool,
            vec![ContentPart::tool_result(tool_call_id, result, error)],
        )
    }

    /// Attach the name of the agent or user that produced this message
    pub fn with_author_name(mut self, author_name: impl Into<String>) -> Self {
        self.author_name = Some(author_name.into());
        self
    }

    /// Attach arbitrary metadata
    pub fn with_metadata(mut self, metadata: HashMap<String, serde_json::Value>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn tool_call_id(&self) -> Option<&str> {
        self.content.iter().find_map(|p| match p {
            ContentPart::ToolResult(tr) => Some(tr.tool_call_id.as_str()),
            _ => None,
        })
    }

    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|p| p.as_text())
    }

    pub fn tool_calls(&self) -> Vec<&ToolCallContentPart> {
        self.content
            .iter()
            .filter_map(|p| match p {
                ContentPart::ToolCall(tc) => Some(tc),
                _ => None,
            })
            .collect()
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|p| matches!(p, ContentPart::ToolCall(_)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_user_message() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.text(), Some("Hello"));
        assert!(msg.author_name.is_none());
    }

    #[test]
    fn test_assistant_with_tools() {
        let msg = Message::assistant_with_tools(
            "Let me check.",
            vec![
                ToolCallContentPart::new("call_1", "get_weather", json!({"city": "Tokyo"})),
                ToolCallContentPart::new("call_2", "get_weather", json!({"city": "Oslo"})),
            ],
        );

        assert_eq!(msg.content.len(), 3);
        assert!(msg.has_tool_calls());
        assert_eq!(msg.tool_calls()[1].id, "call_2");
    }

    #[test]
    fn test_tool_result_message() {
        let msg = Message::tool_result("call_123", Some(json!({"result": "success"})), None);
        assert_eq!(msg.role, MessageRole::Tool);
        assert_eq!(msg.tool_call_id(), Some("call_123"));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(MessageRole::from("Assistant"), MessageRole::Assistant);
        assert_eq!(MessageRole::from("agent"), MessageRole::Assistant);
        assert_eq!(MessageRole::from("tool_result"), MessageRole::Tool);
        assert_eq!(MessageRole::from("SYSTEM"), MessageRole::System);
    }

    #[test]
    fn test_content_part_tagging() {
        let part = ContentPart::tool_call("call_1", "add", json!({"a": 1}));
        let value = serde_json::to_value(&part).unwrap();

        assert_eq!(value["type"], "tool_call");
        assert_eq!(value["name"], "add");
    }

    #[test]
    fn test_null_tool_result_is_not_missing() {
        let null_result: ToolResultContentPart =
            serde_json::from_value(json!({"tool_call_id": "call_1", "result": null})).unwrap();
        assert_eq!(null_result.result, Some(serde_json::Value::Null));

        let missing: ToolResultContentPart =
            serde_json::from_value(json!({"tool_call_id": "call_1"})).unwrap();
        assert_eq!(missing.result, None);
    }
}
