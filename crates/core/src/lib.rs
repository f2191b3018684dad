// Bounded Message Log
//
// This crate provides a store-agnostic, size-capped conversation history
// keyed by thread identifier.
//
// Key design decisions:
// - Uses traits (ListStore, ListStoreConnector, MessageCodec) for pluggable backends
// - The list store is the sole source of ordering truth; nothing is buffered locally
// - Only the configuration (StoreConfig) is persisted by callers, never message content
// - Stored entries carry a schema tag so older and newer entries can share a list
// - No internal retries: store and codec failures surface unchanged

pub mod codec;
pub mod config;
pub mod error;
pub mod log;
pub mod thread_file;
pub mod traits;

// In-memory implementations for examples and testing
pub mod memory;

// Re-exports for convenience
pub use codec::JsonMessageCodec;
pub use config::{generate_thread_id, LogSettings, StoreConfig, ThreadKey, DEFAULT_KEY_PREFIX};
pub use error::{CodecError, MessageLogError, Result};
pub use log::{BoundedMessageLog, BoundedMessageLogBuilder, CorruptEntryPolicy};
pub use memory::{InMemoryConnector, InMemoryListStore};
pub use thread_file::{slugify, ThreadDirectory, ThreadDocument};
pub use traits::{ListStore, ListStoreConnector, MessageCodec};

// Message model re-exports
pub use chatlog_schemas::{ContentPart, Message, MessageRole};
