// Persisted thread documents
//
// A ThreadDocument is the caller-side record of a conversation: a display
// name, the log's StoreConfig and free-form metadata. It never contains
// message content. ThreadDirectory saves and loads these documents as
// pretty-printed JSON files named after a slug of the thread name.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StoreConfig;

const FALLBACK_SLUG: &str = "conversation";
const DOCUMENT_EXTENSION: &str = "json";

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").expect("static regex"));
static REPEATED_DASHES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("static regex"));

/// Errors from reading or writing thread documents
#[derive(Debug, Error)]
pub enum ThreadFileError {
    #[error("thread file I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("thread document is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Turn a free-form thread name into a file-safe slug
///
/// Lowercases, replaces runs of anything outside `[a-z0-9-]` with a single
/// dash and trims dashes from both ends. Falls back to `conversation`.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let replaced = NON_SLUG_CHARS.replace_all(&lowered, "-");
    let collapsed = REPEATED_DASHES.replace_all(&replaced, "-");
    let slug = collapsed.trim_matches('-');
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug.to_string()
    }
}

/// Serialized conversation state owned by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadDocument {
    /// Human-readable thread name
    pub name: String,

    /// Message log configuration (where the messages live)
    pub store_state: StoreConfig,

    /// When the document was last written
    pub saved_at: DateTime<Utc>,

    /// Caller metadata (agent name, labels, ...)
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ThreadDocument {
    pub fn new(name: impl Into<String>, store_state: StoreConfig) -> Self {
        Self {
            name: name.into(),
            store_state,
            saved_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Directory of persisted thread documents
#[derive(Debug, Clone)]
pub struct ThreadDirectory {
    root: PathBuf,
}

impl ThreadDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path for a thread name
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root
            .join(slugify(name))
            .with_extension(DOCUMENT_EXTENSION)
    }

    /// Write a document, creating the directory if needed
    pub async fn save(&self, document: &ThreadDocument) -> Result<PathBuf, ThreadFileError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&document.name);
        let json = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&path, json).await?;
        tracing::debug!(path = %path.display(), "Saved thread document");
        Ok(path)
    }

    /// Read a document by name; `None` if no such file exists
    pub async fn load(&self, name: &str) -> Result<Option<ThreadDocument>, ThreadFileError> {
        let path = self.path_for(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Slugs of every saved document, sorted
    pub async fn list(&self) -> Result<Vec<String>, ThreadFileError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Trip to Lisbon!"), "trip-to-lisbon");
        assert_eq!(slugify("  --Budget   Q3-- "), "budget-q3");
        assert_eq!(slugify("a__b"), "a-b");
        assert_eq!(slugify("???"), "conversation");
        assert_eq!(slugify(""), "conversation");
    }

    #[test]
    fn test_path_for_uses_slug() {
        let dir = ThreadDirectory::new("/tmp/threads");
        assert_eq!(
            dir.path_for("My Thread"),
            PathBuf::from("/tmp/threads/my-thread.json")
        );
    }

    #[tokio::test]
    async fn test_save_load_list() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ThreadDirectory::new(tmp.path().join("persisted_threads"));

        let document = ThreadDocument::new(
            "Trip to Lisbon",
            StoreConfig::new("thread_1")
                .with_key_prefix("lab11")
                .with_max_messages(200),
        )
        .with_metadata("agent", json!("TravelPlanner"));

        let path = dir.save(&document).await.unwrap();
        assert!(path.ends_with("trip-to-lisbon.json"));

        let loaded = dir.load("trip to lisbon").await.unwrap();
        assert_eq!(loaded, Some(document));

        dir.save(&ThreadDocument::new("Budget", StoreConfig::new("thread_2")))
            .await
            .unwrap();
        tokio::fs::write(tmp.path().join("persisted_threads/notes.txt"), "x")
            .await
            .unwrap();

        assert_eq!(dir.list().await.unwrap(), vec!["budget", "trip-to-lisbon"]);
    }

    #[tokio::test]
    async fn test_missing_directory_and_document() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = ThreadDirectory::new(tmp.path().join("nope"));

        assert!(dir.list().await.unwrap().is_empty());
        assert_eq!(dir.load("anything").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_document_embeds_store_state_only() {
        let document = ThreadDocument::new(
            "t",
            StoreConfig::new("thread_1").with_connection_target("redis://localhost:6379"),
        );
        let value = serde_json::to_value(&document).unwrap();

        assert_eq!(value["store_state"]["thread_id"], "thread_1");
        assert_eq!(value["store_state"]["key_prefix"], "chat_messages");
        assert!(value.get("messages").is_none());
        assert!(value.get("metadata").is_none());
    }
}
