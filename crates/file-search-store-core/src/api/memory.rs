//! In-memory [`FileSearchApi`] implementation for testing and offline use.
//!
//! Keeps stores, documents, and pending operations in maps behind a
//! `Mutex`. Ingestion operations finish after a configurable number of
//! status fetches, and `generate_content` answers with a canned response,
//! so pollers and query engines can be exercised deterministically.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use crate::error::{Error, Result};
use crate::generation::{GenerateContentRequest, GenerateContentResponse};
use crate::models::{
    Document, DocumentState, IngestionResponse, ListOptions, Operation, OperationStatus, Page,
    Store, STORE_COLLECTION,
};

use super::{FileSearchApi, ImportFileRequest, OperationSource, UploadRequest};

const DEFAULT_PAGE_SIZE: usize = 10;

struct PendingOperation {
    remaining_fetches: u32,
    document_name: Option<String>,
    operation: Operation,
}

#[derive(Default)]
struct State {
    next_id: u64,
    stores: BTreeMap<String, Store>,
    documents: BTreeMap<String, Document>,
    operations: HashMap<String, PendingOperation>,
    operation_fetches: usize,
    ingestion_failure: Option<OperationStatus>,
    generate_response: GenerateContentResponse,
    generate_requests: Vec<(String, GenerateContentRequest)>,
    uploads: Vec<UploadRequest>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn require_store(&self, name: &str) -> Result<()> {
        if self.stores.contains_key(name) {
            Ok(())
        } else {
            Err(Error::NotFound(format!("store not found: {}", name)))
        }
    }

    fn documents_of<'a>(&'a self, store: &'a str) -> impl Iterator<Item = &'a Document> + 'a {
        let prefix = format!("{}/documents/", store);
        self.documents
            .values()
            .filter(move |d| d.name.starts_with(&prefix))
    }

    /// The stored record plus counters derived from its documents.
    fn store_view(&self, store: &Store) -> Store {
        let mut view = store.clone();
        let count_in = |state: DocumentState| {
            self.documents_of(&store.name)
                .filter(|d| d.state == state)
                .count() as i64
        };
        view.active_documents_count = Some(count_in(DocumentState::Active));
        view.pending_documents_count = Some(count_in(DocumentState::Pending));
        view.failed_documents_count = Some(count_in(DocumentState::Failed));
        view.size_bytes = Some(
            self.documents_of(&store.name)
                .filter_map(|d| d.size_bytes)
                .sum(),
        );
        view
    }

    /// Registers a document and its ingestion operation.
    fn submit_ingestion(
        &mut self,
        store: &str,
        collection: &str,
        document: Document,
        polls_until_done: u32,
    ) -> Operation {
        let op_id = self.next_id();
        let op_name = format!("{}/{}/op-{}", store, collection, op_id);

        if let Some(status) = self.ingestion_failure.clone() {
            let operation = Operation {
                name: op_name.clone(),
                done: polls_until_done == 0,
                error: if polls_until_done == 0 {
                    Some(status.clone())
                } else {
                    None
                },
                ..Default::default()
            };
            let finished = Operation {
                name: op_name.clone(),
                done: true,
                error: Some(status),
                ..Default::default()
            };
            self.operations.insert(
                op_name,
                PendingOperation {
                    remaining_fetches: polls_until_done,
                    document_name: None,
                    operation: finished,
                },
            );
            return operation;
        }

        let response = IngestionResponse {
            type_url: None,
            parent: Some(store.to_string()),
            document_name: Some(document.name.clone()),
            mime_type: document.mime_type.clone(),
            size_bytes: document.size_bytes,
        };
        let finished = Operation {
            name: op_name.clone(),
            done: true,
            error: None,
            response: Some(response),
            metadata: None,
        };

        let document_name = document.name.clone();
        let mut document = document;
        if polls_until_done == 0 {
            document.state = DocumentState::Active;
        }
        self.documents.insert(document_name.clone(), document);

        if polls_until_done == 0 {
            return finished;
        }

        self.operations.insert(
            op_name.clone(),
            PendingOperation {
                remaining_fetches: polls_until_done,
                document_name: Some(document_name),
                operation: finished,
            },
        );
        Operation {
            name: op_name,
            done: false,
            ..Default::default()
        }
    }
}

/// In-memory stand-in for the hosted file-search service.
pub struct InMemoryApi {
    state: Mutex<State>,
    polls_until_done: u32,
}

impl InMemoryApi {
    /// Ingestions complete synchronously (the submitted operation is
    /// already done).
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            polls_until_done: 0,
        }
    }

    /// Ingestions report `done` only on the `n`-th status fetch.
    pub fn with_polls_until_done(mut self, n: u32) -> Self {
        self.polls_until_done = n;
        self
    }

    /// Every subsequent ingestion terminates with this error payload.
    pub fn with_ingestion_failure(self, status: OperationStatus) -> Self {
        self.lock().ingestion_failure = Some(status);
        self
    }

    /// Canned answer for every `generate_content` call.
    pub fn with_generate_response(self, response: GenerateContentResponse) -> Self {
        self.lock().generate_response = response;
        self
    }

    /// Number of `get_operation` calls served so far.
    pub fn operation_fetches(&self) -> usize {
        self.lock().operation_fetches
    }

    /// Every `(model, request)` pair passed to `generate_content`.
    pub fn generate_requests(&self) -> Vec<(String, GenerateContentRequest)> {
        self.lock().generate_requests.clone()
    }

    /// Every upload request received, in order.
    pub fn uploads(&self) -> Vec<UploadRequest> {
        self.lock().uploads.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for InMemoryApi {
    fn default() -> Self {
        Self::new()
    }
}

fn paginate<T: Clone>(items: Vec<T>, options: &ListOptions) -> Result<Page<T>> {
    let offset = match options.page_token.as_deref() {
        None | Some("") => 0,
        Some(token) => token
            .parse::<usize>()
            .map_err(|_| Error::InvalidArgument(format!("invalid page token: {}", token)))?,
    };
    let size = options
        .page_size
        .map(|s| s as usize)
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_PAGE_SIZE);

    let end = offset.saturating_add(size).min(items.len());
    let page_items = items.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
    let next_page_token = if end < items.len() {
        Some(end.to_string())
    } else {
        None
    };

    Ok(Page {
        items: page_items,
        next_page_token,
    })
}

#[async_trait]
impl OperationSource for InMemoryApi {
    async fn get_operation(&self, name: &str) -> Result<Operation> {
        let mut state = self.lock();
        state.operation_fetches += 1;

        let pending = state
            .operations
            .get_mut(name)
            .ok_or_else(|| Error::NotFound(format!("operation not found: {}", name)))?;

        pending.remaining_fetches = pending.remaining_fetches.saturating_sub(1);
        if pending.remaining_fetches > 0 {
            return Ok(Operation {
                name: name.to_string(),
                done: false,
                ..Default::default()
            });
        }

        let finished = pending.operation.clone();
        let document_name = pending.document_name.clone();
        if let Some(doc) = document_name.and_then(|n| state.documents.get_mut(&n)) {
            doc.state = DocumentState::Active;
        }
        Ok(finished)
    }
}

#[async_trait]
impl FileSearchApi for InMemoryApi {
    async fn create_store(&self, display_name: &str) -> Result<Store> {
        let mut state = self.lock();
        let id = state.next_id();
        let now = Utc::now();
        let store = Store {
            name: format!("{}/store-{}", STORE_COLLECTION, id),
            display_name: Some(display_name.to_string()),
            create_time: Some(now),
            update_time: Some(now),
            ..Default::default()
        };
        state.stores.insert(store.name.clone(), store.clone());
        Ok(state.store_view(&store))
    }

    async fn list_stores(&self, options: &ListOptions) -> Result<Page<Store>> {
        let state = self.lock();
        let stores: Vec<Store> = state.stores.values().map(|s| state.store_view(s)).collect();
        paginate(stores, options)
    }

    async fn get_store(&self, name: &str) -> Result<Store> {
        let state = self.lock();
        state
            .stores
            .get(name)
            .map(|s| state.store_view(s))
            .ok_or_else(|| Error::NotFound(format!("store not found: {}", name)))
    }

    async fn delete_store(&self, name: &str, force: bool) -> Result<()> {
        let mut state = self.lock();
        state.require_store(name)?;

        let children: Vec<String> = state.documents_of(name).map(|d| d.name.clone()).collect();
        if !children.is_empty() && !force {
            return Err(Error::PreconditionFailed(format!(
                "store {} still contains {} document(s); pass force to delete them",
                name,
                children.len()
            )));
        }
        for child in children {
            state.documents.remove(&child);
        }
        state.stores.remove(name);
        Ok(())
    }

    async fn upload_to_store(&self, store: &str, request: UploadRequest) -> Result<Operation> {
        let mut state = self.lock();
        state.require_store(store)?;

        let id = state.next_id();
        let now = Utc::now();
        let document = Document {
            name: format!("{}/documents/doc-{}", store, id),
            display_name: request.display_name.clone(),
            state: DocumentState::Pending,
            create_time: Some(now),
            update_time: Some(now),
            size_bytes: Some(request.content.len() as i64),
            mime_type: Some(request.mime_type.clone()),
            custom_metadata: request.custom_metadata.clone(),
        };
        state.uploads.push(request);
        Ok(state.submit_ingestion(store, "upload/operations", document, self.polls_until_done))
    }

    async fn import_file(&self, store: &str, request: ImportFileRequest) -> Result<Operation> {
        let mut state = self.lock();
        state.require_store(store)?;
        if request.file_name.trim().is_empty() {
            return Err(Error::InvalidArgument("file name is required".to_string()));
        }

        let id = state.next_id();
        let now = Utc::now();
        let document = Document {
            name: format!("{}/documents/doc-{}", store, id),
            display_name: request
                .display_name
                .clone()
                .or_else(|| Some(request.file_name.clone())),
            state: DocumentState::Pending,
            create_time: Some(now),
            update_time: Some(now),
            size_bytes: None,
            mime_type: None,
            custom_metadata: request.custom_metadata,
        };
        Ok(state.submit_ingestion(store, "operations", document, self.polls_until_done))
    }

    async fn list_documents(&self, store: &str, options: &ListOptions) -> Result<Page<Document>> {
        let state = self.lock();
        state.require_store(store)?;
        let docs: Vec<Document> = state.documents_of(store).cloned().collect();
        paginate(docs, options)
    }

    async fn get_document(&self, name: &str) -> Result<Document> {
        self.lock()
            .documents
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document not found: {}", name)))
    }

    async fn delete_document(&self, name: &str) -> Result<()> {
        self.lock()
            .documents
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("document not found: {}", name)))
    }

    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let mut state = self.lock();
        for tool in &request.tools {
            if let Some(fs) = &tool.file_search {
                for store in &fs.file_search_store_names {
                    state.require_store(store)?;
                }
            }
        }
        state
            .generate_requests
            .push((model.to_string(), request.clone()));
        Ok(state.generate_response.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pagination_walks_all_stores() {
        let api = InMemoryApi::new();
        for i in 0..5 {
            api.create_store(&format!("store {}", i)).await.unwrap();
        }

        let first = api
            .list_stores(&ListOptions {
                page_size: Some(2),
                page_token: None,
            })
            .await
            .unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.next_page_token.as_deref(), Some("2"));

        let last = api
            .list_stores(&ListOptions {
                page_size: Some(2),
                page_token: Some("4".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_bad_page_token_is_invalid_argument() {
        let api = InMemoryApi::new();
        let err = api
            .list_stores(&ListOptions {
                page_size: None,
                page_token: Some("garbage".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_huge_page_token_is_an_empty_last_page() {
        let api = InMemoryApi::new();
        api.create_store("only").await.unwrap();
        let page = api
            .list_stores(&ListOptions {
                page_size: Some(5),
                page_token: Some((usize::MAX - 1).to_string()),
            })
            .await
            .unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }

    #[tokio::test]
    async fn test_pending_upload_becomes_active() {
        let api = InMemoryApi::new().with_polls_until_done(2);
        let store = api.create_store("s").await.unwrap();
        let op = api
            .upload_to_store(
                &store.name,
                UploadRequest {
                    content: b"hello".to_vec(),
                    mime_type: "text/plain".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!op.done);

        let view = api.get_store(&store.name).await.unwrap();
        assert_eq!(view.pending_documents_count, Some(1));

        assert!(!api.get_operation(&op.name).await.unwrap().done);
        let done = api.get_operation(&op.name).await.unwrap();
        assert!(done.done);

        let view = api.get_store(&store.name).await.unwrap();
        assert_eq!(view.active_documents_count, Some(1));
        assert_eq!(view.size_bytes, Some(5));
    }

    #[tokio::test]
    async fn test_upload_into_missing_store_is_not_found() {
        let api = InMemoryApi::new();
        let err = api
            .upload_to_store("fileSearchStores/missing", UploadRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
