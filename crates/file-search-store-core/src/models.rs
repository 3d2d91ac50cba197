//! Core data models for stores, documents, ingestion operations, and query
//! results.
//!
//! Every type here mirrors a resource of the hosted file-search API. Field
//! names follow the remote's camelCase JSON, and int64 counters are accepted
//! either as JSON numbers or as decimal strings (the remote sends strings).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Collection prefix for store resource names (`fileSearchStores/{id}`).
pub const STORE_COLLECTION: &str = "fileSearchStores";

/// Fallback content type for uploads whose type cannot be inferred.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Turns a bare store id into a full resource name.
///
/// Anything that already contains a `/` is treated as a resource name and
/// returned untouched.
///
/// ```rust
/// use file_search_store_core::models::store_resource_name;
///
/// assert_eq!(store_resource_name("abc123"), "fileSearchStores/abc123");
/// assert_eq!(store_resource_name("fileSearchStores/abc123"), "fileSearchStores/abc123");
/// ```
pub fn store_resource_name(id_or_name: &str) -> String {
    if id_or_name.contains('/') {
        id_or_name.to_string()
    } else {
        format!("{}/{}", STORE_COLLECTION, id_or_name)
    }
}

/// A named container of ingested documents, searchable as a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Store {
    /// Opaque resource name, e.g. `fileSearchStores/my-store-123`.
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "de_int64",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_documents_count: Option<i64>,
    #[serde(
        default,
        deserialize_with = "de_int64",
        skip_serializing_if = "Option::is_none"
    )]
    pub pending_documents_count: Option<i64>,
    #[serde(
        default,
        deserialize_with = "de_int64",
        skip_serializing_if = "Option::is_none"
    )]
    pub failed_documents_count: Option<i64>,
    #[serde(
        default,
        deserialize_with = "de_int64",
        skip_serializing_if = "Option::is_none"
    )]
    pub size_bytes: Option<i64>,
    /// Derived locally by listing the store's documents. Not authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u64>,
}

/// Ingestion state of a document. Owned by the remote service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentState {
    #[serde(rename = "STATE_PENDING")]
    Pending,
    #[serde(rename = "STATE_ACTIVE")]
    Active,
    #[serde(rename = "STATE_FAILED")]
    Failed,
    /// Also catches any state name this crate does not know.
    #[default]
    #[serde(rename = "STATE_UNSPECIFIED")]
    #[serde(other)]
    Unspecified,
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DocumentState::Unspecified => "unspecified",
            DocumentState::Pending => "pending",
            DocumentState::Active => "active",
            DocumentState::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// One ingested unit of content within a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Opaque resource name, child of exactly one store
    /// (`fileSearchStores/{store}/documents/{id}`).
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default)]
    pub state: DocumentState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "de_int64",
        skip_serializing_if = "Option::is_none"
    )]
    pub size_bytes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub custom_metadata: Vec<CustomMetadata>,
}

/// The value half of a metadata entry: a string or a number, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    Numeric(f64),
}

/// A single `(key, value)` metadata entry attached to a document.
///
/// Keys need not be unique within a document. An entry with no value is
/// representable and passed through to the remote unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WireMetadata", into = "WireMetadata")]
pub struct CustomMetadata {
    pub key: String,
    pub value: Option<MetadataValue>,
}

impl CustomMetadata {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(MetadataValue::String(value.into())),
        }
    }

    pub fn numeric(key: impl Into<String>, value: f64) -> Self {
        Self {
            key: key.into(),
            value: Some(MetadataValue::Numeric(value)),
        }
    }

    /// An entry carrying a key but no value.
    pub fn empty(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: None,
        }
    }

    pub fn string_value(&self) -> Option<&str> {
        match &self.value {
            Some(MetadataValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        match self.value {
            Some(MetadataValue::Numeric(n)) => Some(n),
            _ => None,
        }
    }
}

/// The remote's `{key, stringValue?, numericValue?}` triple.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireMetadata {
    #[serde(default)]
    key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    numeric_value: Option<f64>,
}

impl From<WireMetadata> for CustomMetadata {
    fn from(wire: WireMetadata) -> Self {
        let value = match (wire.string_value, wire.numeric_value) {
            (Some(s), _) => Some(MetadataValue::String(s)),
            (None, Some(n)) => Some(MetadataValue::Numeric(n)),
            (None, None) => None,
        };
        Self {
            key: wire.key,
            value,
        }
    }
}

impl From<CustomMetadata> for WireMetadata {
    fn from(meta: CustomMetadata) -> Self {
        let (string_value, numeric_value) = match meta.value {
            Some(MetadataValue::String(s)) => (Some(s), None),
            Some(MetadataValue::Numeric(n)) => (None, Some(n)),
            None => (None, None),
        };
        Self {
            key: meta.key,
            string_value,
            numeric_value,
        }
    }
}

/// Per-ingestion chunking parameters, executed by the remote service.
///
/// Values are passed through as-is; an overlap larger than the chunk size is
/// left for the remote side to reject.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireChunkingConfig", into = "WireChunkingConfig")]
pub struct ChunkingConfig {
    pub max_tokens_per_chunk: Option<u32>,
    pub max_overlap_tokens: Option<u32>,
}

#[derive(Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireChunkingConfig {
    #[serde(default)]
    white_space_config: WhiteSpaceConfig,
}

#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WhiteSpaceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_tokens_per_chunk: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_overlap_tokens: Option<u32>,
}

impl From<WireChunkingConfig> for ChunkingConfig {
    fn from(wire: WireChunkingConfig) -> Self {
        Self {
            max_tokens_per_chunk: wire.white_space_config.max_tokens_per_chunk,
            max_overlap_tokens: wire.white_space_config.max_overlap_tokens,
        }
    }
}

impl From<ChunkingConfig> for WireChunkingConfig {
    fn from(config: ChunkingConfig) -> Self {
        Self {
            white_space_config: WhiteSpaceConfig {
                max_tokens_per_chunk: config.max_tokens_per_chunk,
                max_overlap_tokens: config.max_overlap_tokens,
            },
        }
    }
}

/// Handle to an asynchronous ingestion job.
///
/// Exists only between submission and terminal resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OperationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<IngestionResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Error payload of a failed operation, kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStatus {
    #[serde(default)]
    pub code: i32,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<serde_json::Value>,
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "code {}", self.code)
        } else {
            write!(f, "{} (code {})", self.message, self.code)
        }
    }
}

/// Result payload of a completed upload or import operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionResponse {
    #[serde(rename = "@type", default, skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(
        default,
        deserialize_with = "de_int64",
        skip_serializing_if = "Option::is_none"
    )]
    pub size_bytes: Option<i64>,
}

/// Cursor-based pagination parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListOptions {
    pub page_size: Option<u32>,
    pub page_token: Option<String>,
}

/// One page of a listing. The caller drives continuation with
/// `next_page_token`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            next_page_token: None,
        }
    }
}

/// A reconstructed record linking an answer span to a retrieved chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_index: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

/// Answer text plus citations, derived from one generation response.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub text: String,
    pub citations: Vec<Citation>,
    #[serde(skip)]
    pub raw_response: crate::generation::GenerateContentResponse,
}

/// Accepts an int64 as a JSON number or a decimal string.
fn de_int64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
