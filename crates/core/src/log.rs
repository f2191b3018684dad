// BoundedMessageLog - size-capped conversation history over a list store
//
// Messages of one thread live in a single list at `prefix:thread_id`,
// oldest first. Appends extend the tail and, when a maximum is configured,
// trim the head back down to the newest `max` entries.
//
// Bound enforcement is two round trips (extend, then measure-and-trim) and
// is not atomic: a failure or a concurrent appender between the two steps
// can leave the list longer than the maximum until the next append trims it.

use std::fmt;
use std::sync::Arc;

use chatlog_schemas::Message;
use tracing::{debug, instrument, warn};

use crate::codec::JsonMessageCodec;
use crate::config::{generate_thread_id, StoreConfig, ThreadKey, DEFAULT_KEY_PREFIX};
use crate::error::{CodecError, MessageLogError, Result};
use crate::traits::{ListStore, ListStoreConnector, MessageCodec};

/// What `list_messages` does with an entry that fails to decode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorruptEntryPolicy {
    /// Abort the whole read with `CorruptEntry`
    #[default]
    Fail,
    /// Log a warning and leave the entry out of the result
    Skip,
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`BoundedMessageLog`] with fluent API
#[derive(Clone)]
pub struct BoundedMessageLogBuilder {
    connection_target: Option<String>,
    thread_id: Option<String>,
    key_prefix: String,
    max_messages: Option<usize>,
    codec: Option<Arc<dyn MessageCodec>>,
    corrupt_entries: CorruptEntryPolicy,
}

impl BoundedMessageLogBuilder {
    /// Start building a new log
    pub fn new() -> Self {
        Self {
            connection_target: None,
            thread_id: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            max_messages: None,
            codec: None,
            corrupt_entries: CorruptEntryPolicy::default(),
        }
    }

    /// Set the connection target (required)
    pub fn connection_target(mut self, target: impl Into<String>) -> Self {
        self.connection_target = Some(target.into());
        self
    }

    /// Set the thread identifier; a fresh one is generated otherwise
    pub fn thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    /// Set the key prefix
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the maximum retained message count
    pub fn max_messages(mut self, max: usize) -> Self {
        self.max_messages = Some(max);
        self
    }

    /// Use a custom codec instead of [`JsonMessageCodec`]
    pub fn codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the corrupt entry policy
    pub fn corrupt_entry_policy(mut self, policy: CorruptEntryPolicy) -> Self {
        self.corrupt_entries = policy;
        self
    }

    /// Validate the configuration and open a store handle
    ///
    /// The connector is expected not to touch the network here.
    pub fn build(self, connector: Arc<dyn ListStoreConnector>) -> Result<BoundedMessageLog> {
        let connection_target = self
            .connection_target
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| MessageLogError::config("connection target is required"))?;

        if self.max_messages == Some(0) {
            return Err(MessageLogError::config("max_messages must be positive"));
        }

        let thread_id = self.thread_id.unwrap_or_else(generate_thread_id);
        let key = ThreadKey::new(self.key_prefix, thread_id)?;
        let store = connector.connect(&connection_target)?;

        debug!(key = %key, max_messages = ?self.max_messages, "Opened message log");

        Ok(BoundedMessageLog {
            list_key: key.to_string(),
            key,
            connection_target,
            max_messages: self.max_messages,
            store: Some(store),
            connector,
            codec: self
                .codec
                .unwrap_or_else(|| Arc::new(JsonMessageCodec::new())),
            corrupt_entries: self.corrupt_entries,
        })
    }
}

impl Default for BoundedMessageLogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl From<StoreConfig> for BoundedMessageLogBuilder {
    fn from(config: StoreConfig) -> Self {
        let mut builder = Self::new()
            .thread_id(config.thread_id)
            .key_prefix(config.key_prefix);
        if let Some(target) = config.connection_target {
            builder = builder.connection_target(target);
        }
        if let Some(max) = config.max_messages {
            builder = builder.max_messages(max);
        }
        builder
    }
}

// ============================================================================
// BoundedMessageLog
// ============================================================================

/// Ordered, size-capped message history of one thread
///
/// Owns exactly one store handle until [`close`](Self::close).
pub struct BoundedMessageLog {
    key: ThreadKey,
    list_key: String,
    connection_target: String,
    max_messages: Option<usize>,
    store: Option<Arc<dyn ListStore>>,
    connector: Arc<dyn ListStoreConnector>,
    codec: Arc<dyn MessageCodec>,
    corrupt_entries: CorruptEntryPolicy,
}

impl fmt::Debug for BoundedMessageLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedMessageLog")
            .field("key", &self.list_key)
            .field("max_messages", &self.max_messages)
            .field("corrupt_entries", &self.corrupt_entries)
            .field("closed", &self.store.is_none())
            .finish()
    }
}

impl BoundedMessageLog {
    /// Start building a new log
    pub fn builder() -> BoundedMessageLogBuilder {
        BoundedMessageLogBuilder::new()
    }

    /// Recreate a log from a persisted configuration
    ///
    /// The configuration must carry a connection target.
    pub fn from_config(
        config: StoreConfig,
        connector: Arc<dyn ListStoreConnector>,
    ) -> Result<Self> {
        BoundedMessageLogBuilder::from(config).build(connector)
    }

    pub fn key(&self) -> &ThreadKey {
        &self.key
    }

    /// Fully-qualified list key (`prefix:thread_id`)
    pub fn list_key(&self) -> &str {
        &self.list_key
    }

    pub fn thread_id(&self) -> &str {
        self.key.thread_id()
    }

    pub fn key_prefix(&self) -> &str {
        self.key.prefix()
    }

    pub fn max_messages(&self) -> Option<usize> {
        self.max_messages
    }

    pub fn connection_target(&self) -> &str {
        &self.connection_target
    }

    pub fn is_closed(&self) -> bool {
        self.store.is_none()
    }

    fn store(&self) -> Result<&Arc<dyn ListStore>> {
        self.store.as_ref().ok_or(MessageLogError::Closed)
    }

    /// Append messages in order, then enforce the bound
    ///
    /// An empty slice is a no-op and issues no store call.
    #[instrument(skip(self, messages), fields(key = %self.list_key, count = messages.len()))]
    pub async fn append(&self, messages: &[Message]) -> Result<()> {
        if messages.is_empty() {
            return Ok(());
        }
        let store = self.store()?;

        let encoded = messages
            .iter()
            .map(|m| self.codec.encode(m))
            .collect::<std::result::Result<Vec<_>, CodecError>>()?;

        store.push_tail(&self.list_key, encoded).await?;
        debug!("Appended {} message(s)", messages.len());

        if let Some(max) = self.max_messages {
            let len = store.len(&self.list_key).await?;
            if len > max {
                store.trim(&self.list_key, -(max as isize), -1).await?;
                debug!(dropped = len - max, max, "Trimmed message log");
            }
        }

        Ok(())
    }

    /// Read every stored message, oldest first
    #[instrument(skip(self), fields(key = %self.list_key))]
    pub async fn list_messages(&self) -> Result<Vec<Message>> {
        let raw = self.store()?.range(&self.list_key, 0, -1).await?;

        let mut messages = Vec::with_capacity(raw.len());
        for (index, entry) in raw.iter().enumerate() {
            match self.codec.decode(entry) {
                Ok(message) => messages.push(message),
                Err(e) => match self.corrupt_entries {
                    CorruptEntryPolicy::Fail => {
                        return Err(MessageLogError::corrupt_entry(
                            &self.list_key,
                            index,
                            e.to_string(),
                        ));
                    }
                    CorruptEntryPolicy::Skip => {
                        warn!(index, error = %e, "Skipping unreadable message entry");
                    }
                },
            }
        }

        Ok(messages)
    }

    /// Number of stored entries for this thread
    pub async fn message_count(&self) -> Result<usize> {
        self.store()?.len(&self.list_key).await
    }

    /// Delete every stored message; the configuration is kept
    #[instrument(skip(self), fields(key = %self.list_key))]
    pub async fn clear(&self) -> Result<()> {
        let existed = self.store()?.delete(&self.list_key).await?;
        debug!(existed, "Cleared message log");
        Ok(())
    }

    /// Every thread key stored under this log's prefix, sorted
    pub async fn list_thread_keys(&self) -> Result<Vec<String>> {
        let mut keys = self.store()?.keys(&self.key.prefix_pattern()).await?;
        keys.sort();
        Ok(keys)
    }

    /// Raw entries of an arbitrary key, `None` if the key does not exist
    ///
    /// Read-only; entries are returned as stored, without decoding.
    pub async fn inspect_key(&self, key: &str) -> Result<Option<Vec<String>>> {
        let store = self.store()?;
        if !store.exists(key).await? {
            return Ok(None);
        }
        Ok(Some(store.range(key, 0, -1).await?))
    }

    /// Current configuration; never includes message content
    pub fn export_state(&self) -> StoreConfig {
        StoreConfig {
            thread_id: self.key.thread_id().to_string(),
            connection_target: Some(self.connection_target.clone()),
            key_prefix: self.key.prefix().to_string(),
            max_messages: self.max_messages,
        }
    }

    /// Replace thread id, prefix and bound from a persisted configuration
    ///
    /// Reconnects when the configuration names a different connection
    /// target. Messages are never moved or copied.
    #[instrument(skip(self, config), fields(from = %self.list_key, to_thread = %config.thread_id))]
    pub async fn import_state(&mut self, config: StoreConfig) -> Result<()> {
        self.store()?;
        let key = config.thread_key()?;

        if let Some(target) = config
            .connection_target
            .filter(|t| *t != self.connection_target)
        {
            let store = self.connector.connect(&target)?;
            if let Some(previous) = self.store.replace(store) {
                if let Err(e) = previous.close().await {
                    warn!(error = %e, "Failed to close previous store connection");
                }
            }
            debug!("Reconnected message log to new target");
            self.connection_target = target;
        }

        self.list_key = key.to_string();
        self.key = key;
        self.max_messages = config.max_messages;
        Ok(())
    }

    /// Like [`import_state`](Self::import_state), from the raw persisted record
    pub async fn import_state_value(&mut self, value: serde_json::Value) -> Result<()> {
        let config = StoreConfig::from_value(value)?;
        self.import_state(config).await
    }

    /// Release the store connection; calling it again is a no-op
    pub async fn close(&mut self) -> Result<()> {
        if let Some(store) = self.store.take() {
            store.close().await?;
            debug!(key = %self.list_key, "Closed message log");
        }
        Ok(())
    }
}
