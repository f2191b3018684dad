// Chatlog Schemas
//
// Decision: This crate is the source of truth for the message model
// Decision: Minimal dependencies - only serde, uuid, chrono
// Decision: No runtime logic - only type definitions and serialization

pub mod message;

// Message types
pub use message::{
    ContentPart, ImageContentPart, Message, MessageRole, TextContentPart,
    ToolCallContentPart, ToolResultContentPart,
};
