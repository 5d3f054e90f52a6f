//! Content-addressed blob store for oversized tool outputs.
//!
//! Entries are keyed by a digest of `(source, content type, content)`, so storing the
//! same payload twice hands back the existing entry. The store lives in memory for one
//! session; nothing is evicted or persisted.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex digits of the digest kept in an identifier.
const ID_HASH_LEN: usize = 12;

/// Free-form metadata attached to a blob (row counts, header flags, origin URLs...).
pub type Metadata = BTreeMap<String, Value>;

/// Errors raised by [`BlobStore`] lookups.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlobError {
    /// No entry with the requested identifier.
    #[error("no stored data with id `{id}` (available: {})", available_ids(.available))]
    NotFound {
        /// Identifier that was asked for.
        id: String,
        /// Identifiers currently held by the store.
        available: Vec<String>,
    },
    /// The entry holds binary data where text was required.
    #[error("stored data `{id}` is binary and cannot be processed as text")]
    NotText {
        /// Identifier of the binary entry.
        id: String,
    },
}

fn available_ids(ids: &[String]) -> String {
    if ids.is_empty() {
        "none".to_owned()
    } else {
        ids.join(", ")
    }
}

/// Result type for blob operations.
pub type Result<T> = std::result::Result<T, BlobError>;

/// Kind of content held by a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    /// Unstructured text.
    Text,
    /// Row-oriented text, one row per line.
    Table,
    /// Encoded image bytes.
    Image,
    /// Aggregated output of a task run.
    TaskResult,
}

impl ContentType {
    /// Stable lowercase label, also used as the default identifier prefix.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Table => "table",
            Self::Image => "image",
            Self::TaskResult => "task_result",
        }
    }

    /// Returns `true` for row-oriented content.
    #[must_use]
    pub const fn is_tabular(self) -> bool {
        matches!(self, Self::Table)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
}

impl Payload {
    fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Text(text) => text.as_bytes(),
            Self::Bytes(bytes) => bytes,
        }
    }

    /// Characters for text, bytes for binary data.
    #[must_use]
    pub fn size(&self) -> usize {
        match self {
            Self::Text(text) => text.chars().count(),
            Self::Bytes(bytes) => bytes.len(),
        }
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// A stored blob.
#[derive(Debug, Clone, PartialEq)]
pub struct BlobEntry {
    id: String,
    source: String,
    content_type: ContentType,
    payload: Payload,
    metadata: Metadata,
    created_at: SystemTime,
}

impl BlobEntry {
    /// Identifier of the entry.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Origin of the content, usually the producing tool.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Kind of content held.
    #[must_use]
    pub const fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Raw payload.
    #[must_use]
    pub const fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Text content, if the payload is text.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(text) => Some(text),
            Payload::Bytes(_) => None,
        }
    }

    /// Text content, or [`BlobError::NotText`] for binary payloads.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotText`] when the entry holds bytes.
    pub fn require_text(&self) -> Result<&str> {
        self.text().ok_or_else(|| BlobError::NotText {
            id: self.id.clone(),
        })
    }

    /// Metadata supplied at storage time.
    #[must_use]
    pub const fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// When the entry was first stored.
    #[must_use]
    pub const fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Characters for text, bytes for binary data.
    #[must_use]
    pub fn size(&self) -> usize {
        self.payload.size()
    }

    /// Description of the entry without its content.
    #[must_use]
    pub fn info(&self) -> BlobInfo {
        BlobInfo {
            id: self.id.clone(),
            content_type: self.content_type,
            size: self.size(),
            source: self.source.clone(),
            created_at: self.created_at,
            metadata: self.metadata.clone(),
        }
    }
}

/// Everything about a blob except its content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Identifier of the entry.
    pub id: String,
    /// Kind of content held.
    pub content_type: ContentType,
    /// Characters for text, bytes for binary data.
    pub size: usize,
    /// Origin of the content.
    pub source: String,
    /// When the entry was first stored, as seconds since the Unix epoch.
    #[serde(with = "system_time")]
    pub created_at: SystemTime,
    /// Metadata supplied at storage time.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: Metadata,
}

/// In-memory blob store scoped to one session.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    entries: IndexMap<String, BlobEntry>,
}

impl BlobStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `payload` using its content type as the source label.
    ///
    /// Returns the identifier. Storing identical content of the same type again returns
    /// the same identifier and leaves the first entry untouched.
    pub fn put(
        &mut self,
        payload: impl Into<Payload>,
        content_type: ContentType,
        metadata: Metadata,
    ) -> String {
        self.put_from(content_type.as_str(), payload, content_type, metadata)
    }

    /// Stores `payload` produced by `source`. The source becomes the identifier prefix.
    pub fn put_from(
        &mut self,
        source: &str,
        payload: impl Into<Payload>,
        content_type: ContentType,
        metadata: Metadata,
    ) -> String {
        let payload = payload.into();
        let id = blob_id(source, content_type, &payload);
        let size = payload.size();

        if self.entries.contains_key(&id) {
            tracing::debug!(id = %id, content_type = %content_type, size, reused = true, "blob stored");
            return id;
        }

        tracing::info!(id = %id, content_type = %content_type, size, reused = false, "blob stored");
        self.entries.insert(
            id.clone(),
            BlobEntry {
                id: id.clone(),
                source: source.to_owned(),
                content_type,
                payload,
                metadata,
                created_at: SystemTime::now(),
            },
        );
        id
    }

    /// Looks up an entry.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotFound`] listing the identifiers that do exist.
    pub fn get(&self, id: &str) -> Result<&BlobEntry> {
        self.entries.get(id).ok_or_else(|| BlobError::NotFound {
            id: id.to_owned(),
            available: self.entries.keys().cloned().collect(),
        })
    }

    /// Returns `true` if an entry with `id` exists.
    #[must_use]
    pub fn exists(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Identifier, type and size of every entry, in insertion order.
    pub fn list(&self) -> impl Iterator<Item = (&str, ContentType, usize)> + '_ {
        self.entries
            .values()
            .map(|entry| (entry.id(), entry.content_type, entry.size()))
    }

    /// Describes an entry without returning its content.
    ///
    /// # Errors
    ///
    /// Returns [`BlobError::NotFound`] if no such entry exists.
    pub fn info(&self, id: &str) -> Result<BlobInfo> {
        self.get(id).map(BlobEntry::info)
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn blob_id(source: &str, content_type: ContentType, payload: &Payload) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0]);
    hasher.update(content_type.as_str().as_bytes());
    hasher.update([0]);
    hasher.update(payload.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{source}_{}", &digest[..ID_HASH_LEN])
}

/// Serde support for `SystemTime` as Unix seconds.
mod system_time {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::from_secs(secs))
    }
}
