// Message log configuration
//
// StoreConfig is the persistable identity of a log (thread, prefix, bound,
// connection target). ThreadKey derives the list key from it.
// LogSettings loads defaults from environment variables.

use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{MessageLogError, Result};
use crate::log::BoundedMessageLogBuilder;

/// Default namespace prefix for thread keys
pub const DEFAULT_KEY_PREFIX: &str = "chat_messages";

const KEY_SEPARATOR: char = ':';
const GLOB_CHARS: [char; 5] = ['*', '?', '[', ']', '\\'];

// ============================================================================
// ThreadKey
// ============================================================================

/// Namespace prefix plus thread identifier
///
/// Renders as `prefix:thread_id`. The prefix may not contain the separator,
/// so every key maps back to exactly one (prefix, thread id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ThreadKey {
    prefix: String,
    thread_id: String,
}

impl ThreadKey {
    /// Build a key from explicit parts, validating both
    pub fn new(prefix: impl Into<String>, thread_id: impl Into<String>) -> Result<Self> {
        let prefix = prefix.into();
        let thread_id = thread_id.into();
        validate_prefix(&prefix).map_err(MessageLogError::config)?;
        validate_thread_id(&thread_id).map_err(MessageLogError::config)?;
        Ok(Self { prefix, thread_id })
    }

    /// Build a key with a freshly generated thread identifier
    pub fn generate(prefix: impl Into<String>) -> Result<Self> {
        Self::new(prefix, generate_thread_id())
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Glob pattern matching every thread key under this prefix
    pub fn prefix_pattern(&self) -> String {
        format!("{}{}*", self.prefix, KEY_SEPARATOR)
    }
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.prefix, KEY_SEPARATOR, self.thread_id)
    }
}

/// Generate a new unique thread identifier
pub fn generate_thread_id() -> String {
    format!("thread_{}", Uuid::now_v7())
}

fn validate_prefix(prefix: &str) -> std::result::Result<(), String> {
    if prefix.is_empty() {
        return Err("key prefix must not be empty".to_string());
    }
    if prefix.contains(KEY_SEPARATOR) {
        return Err(format!(
            "key prefix {prefix:?} must not contain '{KEY_SEPARATOR}'"
        ));
    }
    validate_key_chars("key prefix", prefix)
}

fn validate_thread_id(thread_id: &str) -> std::result::Result<(), String> {
    if thread_id.is_empty() {
        return Err("thread id must not be empty".to_string());
    }
    validate_key_chars("thread id", thread_id)
}

fn validate_key_chars(what: &str, value: &str) -> std::result::Result<(), String> {
    if value
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || GLOB_CHARS.contains(&c))
    {
        return Err(format!(
            "{what} {value:?} contains whitespace or glob characters"
        ));
    }
    Ok(())
}

// ============================================================================
// StoreConfig
// ============================================================================

/// Persistable configuration of a message log
///
/// This is the only state that needs to survive a restart; the messages
/// themselves live in the list store. Callers embed it as metadata in their
/// own persisted-conversation documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Thread identifier
    pub thread_id: String,

    /// Connection target (omitted means "unchanged" on import)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_target: Option<String>,

    /// Namespace prefix for the list key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Maximum retained messages (absent means unbounded)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_messages: Option<usize>,
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

impl StoreConfig {
    /// Create a configuration for a thread with default prefix and no bound
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            connection_target: None,
            key_prefix: default_key_prefix(),
            max_messages: None,
        }
    }

    /// Set the connection target
    pub fn with_connection_target(mut self, target: impl Into<String>) -> Self {
        self.connection_target = Some(target.into());
        self
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the maximum retained message count
    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = Some(max_messages);
        self
    }

    /// Parse a persisted record, mapping schema problems to `State` errors
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| MessageLogError::state(e.to_string()))
    }

    /// Serialize to the persisted record shape
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| MessageLogError::state(e.to_string()))
    }

    /// Validate the record and derive its thread key
    pub fn thread_key(&self) -> Result<ThreadKey> {
        validate_thread_id(&self.thread_id).map_err(MessageLogError::state)?;
        validate_prefix(&self.key_prefix).map_err(MessageLogError::state)?;
        if self.max_messages == Some(0) {
            return Err(MessageLogError::state("max_messages must be positive"));
        }
        if matches!(self.connection_target.as_deref(), Some(t) if t.trim().is_empty()) {
            return Err(MessageLogError::state("connection_target must not be blank"));
        }
        Ok(ThreadKey {
            prefix: self.key_prefix.clone(),
            thread_id: self.thread_id.clone(),
        })
    }
}

// ============================================================================
// LogSettings - environment defaults
// ============================================================================

/// Defaults for new logs, loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Connection target (e.g., "redis://localhost:6379/0")
    pub connection_target: Option<String>,

    /// Namespace prefix for thread keys
    pub key_prefix: String,

    /// Maximum retained messages per thread
    pub max_messages: Option<usize>,
}

impl LogSettings {
    /// Create settings from environment variables
    ///
    /// Environment variables:
    /// - `REDIS_URL`: connection target (required to build a log)
    /// - `CHATLOG_KEY_PREFIX`: key prefix (default: chat_messages)
    /// - `CHATLOG_MAX_MESSAGES`: positive retention bound (default: unbounded)
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Create settings from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let connection_target = lookup("REDIS_URL").filter(|v| !v.trim().is_empty());

        let key_prefix = lookup("CHATLOG_KEY_PREFIX")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(default_key_prefix);

        let max_messages = lookup("CHATLOG_MAX_MESSAGES").and_then(|raw| {
            match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    tracing::warn!(
                        value = %raw,
                        "Ignoring CHATLOG_MAX_MESSAGES: expected a positive integer"
                    );
                    None
                }
            }
        });

        Self {
            connection_target,
            key_prefix,
            max_messages,
        }
    }

    /// Start a log builder pre-filled with these settings
    pub fn builder(&self) -> BoundedMessageLogBuilder {
        let mut builder = BoundedMessageLogBuilder::new().key_prefix(self.key_prefix.clone());
        if let Some(target) = &self.connection_target {
            builder = builder.connection_target(target.clone());
        }
        if let Some(max) = self.max_messages {
            builder = builder.max_messages(max);
        }
        builder
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            connection_target: None,
            key_prefix: default_key_prefix(),
            max_messages: None,
        }
    }
}
