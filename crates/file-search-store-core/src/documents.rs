//! Document ingestion and lifecycle.
//!
//! Upload and import both submit an asynchronous operation, hand it to the
//! poller, and then resolve the created document by name. Chunking and
//! metadata are forwarded untouched; the remote service does the chunking.

use std::sync::Arc;

use tracing::{debug, info};

use crate::api::{FileSearchApi, ImportFileRequest, UploadRequest};
use crate::error::{Error, Result};
use crate::models::{
    ChunkingConfig, CustomMetadata, Document, ListOptions, Operation, Page, DEFAULT_MIME_TYPE,
};
use crate::poll::{poll_operation, PollOptions};

/// Raw bytes to ingest, plus what is known about them.
#[derive(Debug, Clone, Default)]
pub struct UploadSource {
    pub content: Vec<u8>,
    /// Used for content-type inference and as the fallback display name.
    pub file_name: Option<String>,
    /// Explicit content type; skips inference when set.
    pub mime_type: Option<String>,
}

/// Optional settings shared by upload and import.
#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    pub display_name: Option<String>,
    pub chunking_config: Option<ChunkingConfig>,
    pub custom_metadata: Vec<CustomMetadata>,
    /// Overrides the manager's default polling for this call.
    pub poll: Option<PollOptions>,
}

/// Picks the content type for an upload.
///
/// An explicit, non-blank type wins. Otherwise the file extension is looked
/// up, and anything unknown falls back to `application/octet-stream`.
///
/// ```rust
/// use file_search_store_core::documents::resolve_mime_type;
///
/// assert_eq!(resolve_mime_type(None, Some("notes.md")), "text/markdown");
/// assert_eq!(resolve_mime_type(None, Some("blob.zzz")), "application/octet-stream");
/// assert_eq!(resolve_mime_type(Some("text/csv"), Some("a.txt")), "text/csv");
/// ```
pub fn resolve_mime_type(explicit: Option<&str>, file_name: Option<&str>) -> String {
    if let Some(mime) = explicit.map(str::trim).filter(|m| !m.is_empty()) {
        return mime.to_string();
    }
    file_name
        .and_then(|name| mime_guess::from_path(name).first())
        .map(|mime| mime.essence_str().to_string())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string())
}

#[derive(Clone)]
pub struct DocumentManager {
    api: Arc<dyn FileSearchApi>,
    poll: PollOptions,
}

impl DocumentManager {
    pub fn new(api: Arc<dyn FileSearchApi>, poll: PollOptions) -> Self {
        Self { api, poll }
    }

    /// Uploads inline bytes into `store` and waits for ingestion to finish.
    pub async fn upload(
        &self,
        store: &str,
        source: UploadSource,
        options: &IngestOptions,
    ) -> Result<Document> {
        let mime_type = resolve_mime_type(source.mime_type.as_deref(), source.file_name.as_deref());
        let display_name = options
            .display_name
            .clone()
            .or_else(|| source.file_name.as_deref().map(base_name));

        debug!(
            store,
            mime_type = %mime_type,
            bytes = source.content.len(),
            "submitting upload"
        );
        let request = UploadRequest {
            content: source.content,
            mime_type,
            display_name,
            chunking_config: options.chunking_config,
            custom_metadata: options.custom_metadata.clone(),
        };
        let operation = self.api.upload_to_store(store, request).await?;
        self.finish(operation, options).await
    }

    /// Imports a file already held by the remote Files API into `store`.
    pub async fn import(
        &self,
        store: &str,
        file_name: &str,
        options: &IngestOptions,
    ) -> Result<Document> {
        if file_name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "file reference must not be empty".to_string(),
            ));
        }
        let request = ImportFileRequest {
            file_name: file_name.to_string(),
            display_name: options.display_name.clone(),
            chunking_config: options.chunking_config,
            custom_metadata: options.custom_metadata.clone(),
        };
        let operation = self.api.import_file(store, request).await?;
        self.finish(operation, options).await
    }

    pub async fn list(&self, store: &str, options: &ListOptions) -> Result<Page<Document>> {
        self.api.list_documents(store, options).await
    }

    /// Follows page tokens until the listing is exhausted.
    pub async fn list_all(&self, store: &str) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut options = ListOptions::default();
        loop {
            let page = self.api.list_documents(store, &options).await?;
            documents.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => options.page_token = Some(token),
                _ => return Ok(documents),
            }
        }
    }

    pub async fn get(&self, name: &str) -> Result<Document> {
        self.api.get_document(name).await
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        self.api.delete_document(name).await?;
        info!(document = %name, "deleted document");
        Ok(())
    }

    async fn finish(&self, operation: Operation, options: &IngestOptions) -> Result<Document> {
        let poll = options.poll.unwrap_or(self.poll);
        let done = poll_operation(self.api.as_ref(), operation, &poll).await?;

        let document_name = done
            .response
            .and_then(|r| r.document_name)
            .ok_or_else(|| {
                Error::Decode(format!(
                    "operation {} finished without a document name",
                    done.name
                ))
            })?;

        info!(document = %document_name, "ingestion finished");
        self.api.get_document(&document_name).await
    }
}

fn base_name(path: &str) -> String {
    path.rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(path)
        .to_string()
}
