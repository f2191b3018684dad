// In-memory implementations for examples and testing
//
// InMemoryListStore mirrors the Redis list semantics the log relies on
// (tail push, inclusive ranges with negative indices, trim, empty lists
// vanish). InMemoryConnector hands out one shared store per target so two
// logs pointed at the same target see the same data.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use regex::Regex;

use crate::error::{MessageLogError, Result};
use crate::traits::{ListStore, ListStoreConnector};

// ============================================================================
// InMemoryListStore
// ============================================================================

/// In-memory list store
///
/// Stores lists in a HashMap keyed by list key. Counts calls and mutations
/// and can simulate an unreachable server.
#[derive(Debug, Default)]
pub struct InMemoryListStore {
    lists: RwLock<HashMap<String, Vec<String>>>,
    calls: AtomicUsize,
    mutations: AtomicUsize,
    closes: AtomicUsize,
    unavailable: AtomicBool,
}

impl InMemoryListStore {
    /// Create a new in-memory list store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations issued so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of mutating operations (push, trim, delete) issued so far
    pub fn mutation_count(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    /// Number of times a handle to this store was closed
    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// Make every subsequent operation fail with a connection error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Pre-populate a key with raw entries (useful for testing)
    pub fn seed(&self, key: impl Into<String>, values: Vec<String>) {
        self.lists.write().insert(key.into(), values);
    }

    /// Raw entries under a key, bypassing counters
    pub fn raw(&self, key: &str) -> Option<Vec<String>> {
        self.lists.read().get(key).cloned()
    }

    fn begin(&self, mutating: bool) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(MessageLogError::connection("in-memory store is unavailable"));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if mutating {
            self.mutations.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Resolve Redis-style inclusive indices against a list length
fn resolve_range(len: usize, start: isize, stop: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };
    if len == 0 || start > stop || start >= len || stop < 0 {
        return None;
    }
    Some((start as usize, stop as usize))
}

/// Translate a Redis glob (`*`, `?`) into an anchored regex
fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut expr = String::with_capacity(pattern.len() + 2);
    expr.push('^');
    for c in pattern.chars() {
        match c {
            '*' => expr.push_str(".*"),
            '?' => expr.push('.'),
            other => expr.push_str(&regex::escape(&other.to_string())),
        }
    }
    expr.push('$');
    Regex::new(&expr).map_err(|e| MessageLogError::config(format!("invalid key pattern: {e}")))
}

#[async_trait]
impl ListStore for InMemoryListStore {
    async fn push_tail(&self, key: &str, values: Vec<String>) -> Result<()> {
        self.begin(true)?;
        self.lists
            .write()
            .entry(key.to_string())
            .or_default()
            .extend(values);
        Ok(())
    }

    async fn range(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        self.begin(false)?;
        let lists = self.lists.read();
        let Some(list) = lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match resolve_range(list.len(), start, stop) {
            Some((from, to)) => list[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn trim(&self, key: &str, start: isize, stop: isize) -> Result<()> {
        self.begin(true)?;
        let mut lists = self.lists.write();
        let Some(list) = lists.get_mut(key) else {
            return Ok(());
        };
        match resolve_range(list.len(), start, stop) {
            Some((from, to)) => {
                list.truncate(to + 1);
                list.drain(..from);
            }
            None => {
                lists.remove(key);
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        self.begin(true)?;
        Ok(self.lists.write().remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.begin(false)?;
        Ok(self.lists.read().contains_key(key))
    }

    async fn len(&self, key: &str) -> Result<usize> {
        self.begin(false)?;
        Ok(self.lists.read().get(key).map(|l| l.len()).unwrap_or(0))
    }

    async fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        self.begin(false)?;
        let matcher = glob_to_regex(pattern)?;
        Ok(self
            .lists
            .read()
            .keys()
            .filter(|k| matcher.is_match(k))
            .cloned()
            .collect())
    }

    async fn close(&self) -> Result<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ============================================================================
// InMemoryConnector
// ============================================================================

/// Connector handing out one shared [`InMemoryListStore`] per target
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnector {
    stores: Arc<Mutex<HashMap<String, Arc<InMemoryListStore>>>>,
    connects: Arc<AtomicUsize>,
}

impl InMemoryConnector {
    /// Create a new connector with no stores
    pub fn new() -> Self {
        Self::default()
    }

    /// The store behind a target, creating it if needed
    pub fn store(&self, target: &str) -> Arc<InMemoryListStore> {
        self.stores
            .lock()
            .entry(target.to_string())
            .or_default()
            .clone()
    }

    /// Number of handles opened through this connector
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ListStoreConnector for InMemoryConnector {
    fn connect(&self, target: &str) -> Result<Arc<dyn ListStore>> {
        if target.trim().is_empty() {
            return Err(MessageLogError::config("connection target must not be empty"));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        let store: Arc<dyn ListStore> = self.store(target);
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(5, 0, -1), Some((0, 4)));
        assert_eq!(resolve_range(5, -3, -1), Some((2, 4)));
        assert_eq!(resolve_range(5, -10, 2), Some((0, 2)));
        assert_eq!(resolve_range(5, 1, 100), Some((1, 4)));
        assert_eq!(resolve_range(5, 4, 2), None);
        assert_eq!(resolve_range(5, 7, 9), None);
        assert_eq!(resolve_range(0, 0, -1), None);
    }

    #[tokio::test]
    async fn test_push_and_range() {
        let store = InMemoryListStore::new();
        store.push_tail("k", values(&["a", "b"])).await.unwrap();
        store.push_tail("k", values(&["c"])).await.unwrap();

        assert_eq!(store.range("k", 0, -1).await.unwrap(), values(&["a", "b", "c"]));
        assert_eq!(store.range("k", -2, -1).await.unwrap(), values(&["b", "c"]));
        assert!(store.range("missing", 0, -1).await.unwrap().is_empty());
        assert_eq!(store.len("k").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_trim_keeps_tail() {
        let store = InMemoryListStore::new();
        store
            .push_tail("k", values(&["a", "b", "c", "d", "e"]))
            .await
            .unwrap();

        store.trim("k", -3, -1).await.unwrap();
        assert_eq!(store.raw("k"), Some(values(&["c", "d", "e"])));
    }

    #[tokio::test]
    async fn test_trim_to_empty_removes_key() {
        let store = InMemoryListStore::new();
        store.push_tail("k", values(&["a"])).await.unwrap();

        store.trim("k", 5, 10).await.unwrap();
        assert!(!store.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_and_exists() {
        let store = InMemoryListStore::new();
        store.push_tail("k", values(&["a"])).await.unwrap();

        assert!(store.exists("k").await.unwrap());
        assert!(store.delete("k").await.unwrap());
        assert!(!store.delete("k").await.unwrap());
        assert_eq!(store.len("k").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_keys_glob() {
        let store = InMemoryListStore::new();
        store.seed("lab11:thread_a", values(&["x"]));
        store.seed("lab11:thread_b", values(&["x"]));
        store.seed("lab10:thread_c", values(&["x"]));
        store.seed("lab11.other", values(&["x"]));

        let mut keys = store.keys("lab11:*").await.unwrap();
        keys.sort();
        assert_eq!(keys, values(&["lab11:thread_a", "lab11:thread_b"]));

        let keys = store.keys("lab1?:thread_c").await.unwrap();
        assert_eq!(keys, values(&["lab10:thread_c"]));
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_with_connection_error() {
        let store = InMemoryListStore::new();
        store.set_unavailable(true);

        let err = store.len("k").await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_counters() {
        let store = InMemoryListStore::new();
        store.push_tail("k", values(&["a"])).await.unwrap();
        store.range("k", 0, -1).await.unwrap();
        store.delete("k").await.unwrap();

        assert_eq!(store.call_count(), 3);
        assert_eq!(store.mutation_count(), 2);
    }

    #[test]
    fn test_connector_shares_store_per_target() {
        let connector = InMemoryConnector::new();
        connector.connect("memory://a").unwrap();
        connector.connect("memory://a").unwrap();

        assert!(Arc::ptr_eq(
            &connector.store("memory://a"),
            &connector.store("memory://a")
        ));
        assert!(!Arc::ptr_eq(
            &connector.store("memory://a"),
            &connector.store("memory://b")
        ));
        assert_eq!(connector.connect_count(), 2);
        assert!(matches!(
            connector.connect(" "),
            Err(MessageLogError::Configuration(_))
        ));
    }
}
