//! Redis implementation of ListStore
//!
//! Each list command maps onto one Redis command:
//! - `push_tail` → RPUSH
//! - `range` → LRANGE
//! - `trim` → LTRIM
//! - `delete` → DEL
//! - `exists` → EXISTS
//! - `len` → LLEN
//! - `keys` → KEYS

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chatlog_core::{
    BoundedMessageLog, BoundedMessageLogBuilder, ListStore, ListStoreConnector, LogSettings,
    MessageLogError, Result,
};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument};

fn connection_error(context: &str, e: RedisError) -> MessageLogError {
    error!("Redis {} failed: {}", context, e);
    MessageLogError::connection(format!("redis {context} failed: {e}"))
}

/// Redis-backed list store
///
/// Parsing the URL happens on construction; the TCP/TLS connection is
/// established on the first command and reused until [`close`](ListStore::close).
///
/// # Example
///
/// ```ignore
/// use chatlog_storage::RedisListStore;
///
/// let store = RedisListStore::open("redis://localhost:6379/0")?;
/// ```
pub struct RedisListStore {
    client: Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
}

impl RedisListStore {
    /// Validate a Redis URL without connecting
    pub fn open(url: &str) -> Result<Self> {
        let client = Client::open(url)
            .map_err(|e| MessageLogError::config(format!("invalid Redis URL: {e}")))?;
        Ok(Self {
            client,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    /// Whether a connection has been established
    pub async fn is_connected(&self) -> bool {
        self.connection.lock().await.is_some()
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(MessageLogError::Closed);
        }

        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| connection_error("connect", e))?;
        debug!("Opened Redis connection");
        *guard = Some(conn.clone());
        Ok(conn)
    }
}

#[async_trait]
impl ListStore for RedisListStore {
    #[instrument(skip(self, values), fields(count = values.len()))]
    async fn push_tail(&self, key: &str, values: Vec<String>) -> Result<()> {
        if values.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection().await?;
        let _: usize = conn
            .rpush(key, values)
            .await
            .map_err(|e| connection_error("RPUSH", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.lrange(key, start, stop)
            .await
            .map_err(|e| connection_error("LRANGE", e))
    }

    #[instrument(skip(self))]
    async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn
            .ltrim(key, start, stop)
            .await
            .map_err(|e| connection_error("LTRIM", e))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let removed: usize = conn
            .del(key)
            .await
            .map_err(|e| connection_error("DEL", e))?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        conn.exists(key)
            .await
            .map_err(|e| connection_error("EXISTS", e))
    }

    async fn len(&self, key: &str) -> Result<usize> {
        let mut conn = self.connection().await?;
        conn.llen(key)
            .await
            .map_err(|e| connection_error("LLEN", e))
    }

    #[instrument(skip(self))]
    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        conn.keys(pattern)
            .await
            .map_err(|e| connection_error("KEYS", e))
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        if self.connection.lock().await.take().is_some() {
            debug!("Closed Redis connection");
        }
        Ok(())
    }
}

// ============================================================================
// Connector and factory functions
// ============================================================================

/// Opens one [`RedisListStore`] (one connection) per log
#[derive(Debug, Clone, Copy, Default)]
pub struct RedisConnector;

impl ListStoreConnector for RedisConnector {
    fn connect(&self, target: &str) -> Result<Arc<dyn ListStore>> {
        let store: Arc<dyn ListStore> = Arc::new(RedisListStore::open(target)?);
        Ok(store)
    }
}

/// Create a Redis-backed message log from a builder
pub fn create_redis_message_log(builder: BoundedMessageLogBuilder) -> Result<BoundedMessageLog> {
    builder.build(Arc::new(RedisConnector))
}

/// Create a Redis-backed message log from `REDIS_URL` and `CHATLOG_*` variables
pub fn redis_message_log_from_env() -> Result<BoundedMessageLog> {
    create_redis_message_log(LogSettings::from_env().builder())
}
