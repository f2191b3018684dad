//! Versioned JSON wire format for stored messages
//!
//! Every stored entry is a compact JSON object carrying a required
//! `schema` tag. Decoding dispatches on that tag, so entries written by
//! older releases stay readable next to new ones:
//!
//! - `chatlog.message.v2` (current): id, role, content parts, author name,
//!   metadata, created_at
//! - `chatlog.message.v1`: id, role, a single `text` body, created_at
//!
//! New entries are always written as v2.

use std::collections::HashMap;

use chatlog_schemas::{ContentPart, Message, MessageRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CodecError;
use crate::traits::MessageCodec;

pub const SCHEMA_V1: &str = "chatlog.message.v1";
pub const SCHEMA_V2: &str = "chatlog.message.v2";

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "schema")]
enum WireMessage {
    #[serde(rename = "chatlog.message.v1")]
    V1(WireMessageV1),
    #[serde(rename = "chatlog.message.v2")]
    V2(WireMessageV2),
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessageV1 {
    id: Uuid,
    role: MessageRole,
    text: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessageV2 {
    id: Uuid,
    role: MessageRole,
    content: Vec<ContentPart>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<HashMap<String, serde_json::Value>>,
    created_at: DateTime<Utc>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        match wire {
            WireMessage::V1(v1) => Message {
                id: v1.id,
                role: v1.role,
                content: vec![ContentPart::text(v1.text)],
                author_name: None,
                metadata: None,
                created_at: v1.created_at,
            },
            WireMessage::V2(v2) => Message {
                id: v2.id,
                role: v2.role,
                content: v2.content,
                author_name: v2.author_name,
                metadata: v2.metadata,
                created_at: v2.created_at,
            },
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        WireMessage::V2(WireMessageV2 {
            id: message.id,
            role: message.role,
            content: message.content.clone(),
            author_name: message.author_name.clone(),
            metadata: message.metadata.clone(),
            created_at: message.created_at,
        })
    }
}

/// Default codec: compact JSON with a schema tag
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonMessageCodec;

impl JsonMessageCodec {
    pub fn new() -> Self {
        Self
    }
}

impl MessageCodec for JsonMessageCodec {
    fn encode(&self, message: &Message) -> Result<String, CodecError> {
        serde_json::to_string(&WireMessage::from(message))
            .map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, raw: &str) -> Result<Message, CodecError> {
        serde_json::from_str::<WireMessage>(raw)
            .map(Message::from)
            .map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chatlog_schemas::{ImageContentPart, ToolCallContentPart};
    use serde_json::json;

    use super::*;

    #[test]
    fn test_round_trip_text_message() {
        let codec = JsonMessageCodec::new();
        let message = Message::user("Plan a weekend in Lisbon");

        let encoded = codec.encode(&message).unwrap();
        assert_eq!(codec.decode(&encoded).unwrap(), message);
    }

    #[test]
    fn test_round_trip_structured_message() {
        let codec = JsonMessageCodec::new();
        let mut metadata = HashMap::new();
        metadata.insert("turn".to_string(), json!(4));
        metadata.insert("labels".to_string(), json!(["travel", "budget"]));

        let message = Message::new(
            MessageRole::Assistant,
            vec![
                ContentPart::text("Checking flights"),
                ContentPart::Image(ImageContentPart::from_base64("aGVsbG8=", "image/png")),
                ContentPart::ToolCall(ToolCallContentPart::new(
                    "call_1",
                    "search_flights",
                    json!({"from": "OSL", "to": "LIS", "filters": {"max_stops": 1}}),
                )),
            ],
        )
        .with_author_name("TravelPlanner")
        .with_metadata(metadata);

        let encoded = codec.encode(&message).unwrap();
        let decoded = codec.decode(&encoded).unwrap();

        assert_eq!(decoded, message);
        assert_eq!(decoded.author_name.as_deref(), Some("TravelPlanner"));
    }

    #[test]
    fn test_round_trip_tool_result() {
        let codec = JsonMessageCodec::new();
        let message = Message::tool_result("call_1", None, Some("timeout".to_string()));

        let decoded = codec.decode(&codec.encode(&message).unwrap()).unwrap();
        assert_eq!(decoded, message);
        assert_eq!(decoded.tool_call_id(), Some("call_1"));
    }

    fn assert_round_trip(message: &Message) {
        let codec = JsonMessageCodec::new();
        let encoded = codec.encode(message).unwrap();
        assert_eq!(&codec.decode(&encoded).unwrap(), message, "encoded: {encoded}");
    }

    #[test]
    fn test_round_trip_null_tool_result() {
        let message = Message::tool_result("call_1", Some(serde_json::Value::Null), None);
        assert_round_trip(&message);

        let encoded = JsonMessageCodec.encode(&message).unwrap();
        assert!(encoded.contains(r#""result":null"#));
    }

    #[test]
    fn test_round_trip_floats() {
        let floats = [
            971.9863718547629,
            0.1 + 0.2,
            1.0 / 3.0,
            -2.2250738585072014e-308,
            5e-324,
            f64::MAX,
            f64::MIN_POSITIVE,
        ];

        for value in floats {
            let mut metadata = HashMap::new();
            metadata.insert("price".to_string(), json!(value));
            metadata.insert("nested".to_string(), json!({"ratios": [value, -value]}));

            let message = Message::new(
                MessageRole::Assistant,
                vec![
                    ContentPart::tool_call("call_1", "convert", json!({"amount": value})),
                    ContentPart::tool_result("call_1", Some(json!(value)), None),
                ],
            )
            .with_metadata(metadata);

            assert_round_trip(&message);
        }
    }

    #[test]
    fn test_round_trip_empty_content() {
        assert_round_trip(&Message::new(MessageRole::User, Vec::new()));
    }

    #[test]
    fn test_round_trip_empty_metadata() {
        let message = Message::user("hi").with_metadata(HashMap::new());
        assert_round_trip(&message);
        assert_eq!(message.metadata, Some(HashMap::new()));
    }

    #[test]
    fn test_round_trip_empty_image_part() {
        let message = Message::new(
            MessageRole::User,
            vec![ContentPart::Image(ImageContentPart {
                url: None,
                base64: None,
                media_type: None,
            })],
        );
        assert_round_trip(&message);
    }

    #[test]
    fn test_round_trip_tool_result_with_result_and_error() {
        let message = Message::tool_result(
            "call_9",
            Some(json!({"partial": [1, 2.5, null]})),
            Some("truncated".to_string()),
        )
        .with_author_name("");
        assert_round_trip(&message);
    }

    #[test]
    fn test_encode_writes_schema_tag() {
        let encoded = JsonMessageCodec.encode(&Message::system("Be concise")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["schema"], SCHEMA_V2);
        assert_eq!(value["role"], "system");
        assert_eq!(value["content"][0]["type"], "text");
        assert!(!encoded.contains('\n'));
    }

    #[test]
    fn test_decode_v1_entry() {
        let raw = json!({
            "schema": SCHEMA_V1,
            "id": "0191b0a0-7c1e-7cc0-8a3e-5d2f6f0b9a11",
            "role": "assistant",
            "text": "Lisbon is sunny in May.",
            "created_at": "2024-05-01T10:00:00Z"
        })
        .to_string();

        let message = JsonMessageCodec.decode(&raw).unwrap();
        assert_eq!(message.role, MessageRole::Assistant);
        assert_eq!(message.text(), Some("Lisbon is sunny in May."));
        assert_eq!(message.content.len(), 1);
        assert!(message.metadata.is_none());
    }

    #[test]
    fn test_decode_rejects_missing_schema() {
        let raw = json!({
            "id": "0191b0a0-7c1e-7cc0-8a3e-5d2f6f0b9a11",
            "role": "user",
            "content": [],
            "created_at": "2024-05-01T10:00:00Z"
        })
        .to_string();

        assert!(matches!(
            JsonMessageCodec.decode(&raw),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_schema() {
        let raw = json!({"schema": "chatlog.message.v9", "text": "hi"}).to_string();
        assert!(matches!(
            JsonMessageCodec.decode(&raw),
            Err(CodecError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(JsonMessageCodec.decode("not json").is_err());
    }
}
