//! Remote API abstraction.
//!
//! The [`FileSearchApi`] trait is the seam between the transport-free logic
//! in this crate (poller, managers, query engine) and whatever talks to the
//! hosted service. The root crate provides the REST implementation;
//! [`memory::InMemoryApi`] backs tests and offline use.
//!
//! All resources are addressed by opaque resource-name strings of the form
//! `<collection>/<id>` and passed through untouched.

pub mod memory;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;
use crate::generation::{GenerateContentRequest, GenerateContentResponse};
use crate::models::{ChunkingConfig, CustomMetadata, Document, ListOptions, Operation, Page, Store};

/// Re-fetches the status of an asynchronous operation.
///
/// Split from [`FileSearchApi`] so the poller depends on nothing else.
#[async_trait]
pub trait OperationSource: Send + Sync {
    async fn get_operation(&self, name: &str) -> Result<Operation>;
}

/// Inline-bytes ingestion request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadRequest {
    pub content: Vec<u8>,
    /// Already resolved; never empty.
    pub mime_type: String,
    pub display_name: Option<String>,
    pub chunking_config: Option<ChunkingConfig>,
    pub custom_metadata: Vec<CustomMetadata>,
}

/// Ingestion keyed off a file already held by the remote Files API.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportFileRequest {
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunking_config: Option<ChunkingConfig>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_metadata: Vec<CustomMetadata>,
}

/// Every remote call the core needs.
///
/// Implementations map remote failures onto [`crate::Error`]: an unknown
/// name is `NotFound`, deleting a non-empty store without `force` is
/// `PreconditionFailed`.
///
/// | Method | Remote endpoint |
/// |--------|-----------------|
/// | [`create_store`](FileSearchApi::create_store) | `POST fileSearchStores` |
/// | [`list_stores`](FileSearchApi::list_stores) | `GET fileSearchStores` |
/// | [`get_store`](FileSearchApi::get_store) | `GET {store}` |
/// | [`delete_store`](FileSearchApi::delete_store) | `DELETE {store}` |
/// | [`upload_to_store`](FileSearchApi::upload_to_store) | `POST {store}:uploadToFileSearchStore` |
/// | [`import_file`](FileSearchApi::import_file) | `POST {store}:importFile` |
/// | [`list_documents`](FileSearchApi::list_documents) | `GET {store}/documents` |
/// | [`get_document`](FileSearchApi::get_document) | `GET {document}` |
/// | [`delete_document`](FileSearchApi::delete_document) | `DELETE {document}` |
/// | [`generate_content`](FileSearchApi::generate_content) | `POST models/{model}:generateContent` |
#[async_trait]
pub trait FileSearchApi: OperationSource {
    async fn create_store(&self, display_name: &str) -> Result<Store>;

    async fn list_stores(&self, options: &ListOptions) -> Result<Page<Store>>;

    async fn get_store(&self, name: &str) -> Result<Store>;

    async fn delete_store(&self, name: &str, force: bool) -> Result<()>;

    /// Submits inline content. Returns the (possibly unfinished) operation.
    async fn upload_to_store(&self, store: &str, request: UploadRequest) -> Result<Operation>;

    /// Submits an import. Returns the (possibly unfinished) operation.
    async fn import_file(&self, store: &str, request: ImportFileRequest) -> Result<Operation>;

    async fn list_documents(&self, store: &str, options: &ListOptions) -> Result<Page<Document>>;

    async fn get_document(&self, name: &str) -> Result<Document>;

    async fn delete_document(&self, name: &str) -> Result<()>;

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse>;
}
