// Core traits for pluggable backends
//
// These traits allow the message log to run against different backends:
// - In-memory list store for tests
// - Redis lists for production (chatlog-storage)
//
// The codec is a seam of its own so the wire format can evolve
// independently of the store.

use std::sync::Arc;

use async_trait::async_trait;
use chatlog_schemas::Message;

use crate::error::{CodecError, Result};

// ============================================================================
// ListStore - Ordered list key-value protocol
// ============================================================================

/// Ordered list key-value store
///
/// Index arguments follow Redis semantics: `0` is the head, negative
/// values count from the tail (`-1` is the last element) and `stop` is
/// inclusive.
///
/// Transport failures must surface as
/// [`MessageLogError::Connection`](crate::MessageLogError::Connection).
#[async_trait]
pub trait ListStore: Send + Sync {
    /// Append values to the tail of the list at `key`, creating it if needed
    async fn push_tail(&self, key: &str, values: Vec<String>) -> Result<()>;

    /// Read the inclusive range `[start, stop]` in stored order
    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>>;

    /// Keep only the inclusive range `[start, stop]`
    async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<()>;

    /// Delete the key; returns whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Whether the key exists
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Number of elements in the list (0 if the key does not exist)
    async fn len(&self, key: &str) -> Result<usize>;

    /// Enumerate keys matching a glob pattern (`*`, `?`)
    async fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Release the underlying connection
    async fn close(&self) -> Result<()>;
}

// ============================================================================
// ListStoreConnector - Opens store handles from connection targets
// ============================================================================

/// Opens [`ListStore`] handles for a connection target
///
/// `connect` must not perform network I/O; implementations validate the
/// target and defer the actual connection to the first command.
pub trait ListStoreConnector: Send + Sync {
    fn connect(&self, target: &str) -> Result<Arc<dyn ListStore>>;
}

// ============================================================================
// MessageCodec - Message <-> stored entry
// ============================================================================

/// Converts messages to and from their stored representation
///
/// Implementations must satisfy `decode(encode(m)) == m` and produce
/// self-describing output, since entries written by different versions
/// can coexist in one list.
pub trait MessageCodec: Send + Sync {
    fn encode(&self, message: &Message) -> std::result::Result<String, CodecError>;

    fn decode(&self, raw: &str) -> std::result::Result<Message, CodecError>;
}
