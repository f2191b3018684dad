// Error types for the message log

use thiserror::Error;

/// Result type alias for message log operations
pub type Result<T> = std::result::Result<T, MessageLogError>;

/// Errors raised by a [`MessageCodec`](crate::traits::MessageCodec)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Message could not be serialized
    #[error("encode failed: {0}")]
    Encode(String),

    /// Stored bytes could not be turned back into a message
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Errors that can occur while operating a message log
#[derive(Debug, Error)]
pub enum MessageLogError {
    /// Required connection target missing or invalid, or invalid construction options
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure reaching the list store
    #[error("connection error: {0}")]
    Connection(String),

    /// A stored entry failed to decode
    #[error("corrupt entry at index {index} of {key}: {reason}")]
    CorruptEntry {
        key: String,
        index: usize,
        reason: String,
    },

    /// Persisted state record is missing or carries invalid fields
    #[error("invalid store state: {0}")]
    State(String),

    /// A message failed to encode
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The log was closed
    #[error("message log is closed")]
    Closed,
}

impl MessageLogError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        MessageLogError::Configuration(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        MessageLogError::Connection(msg.into())
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        MessageLogError::State(msg.into())
    }

    /// Create a corrupt entry error
    pub fn corrupt_entry(key: impl Into<String>, index: usize, reason: impl Into<String>) -> Self {
        MessageLogError::CorruptEntry {
            key: key.into(),
            index,
            reason: reason.into(),
        }
    }

    /// Whether the failure came from the transport rather than from data or usage
    pub fn is_connection(&self) -> bool {
        matches!(self, MessageLogError::Connection(_))
    }
}
