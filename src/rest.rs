//! REST transport for the hosted file-search API.
//!
//! [`RestApi`] implements [`FileSearchApi`] over `reqwest`. Every call sends
//! the key in the `x-goog-api-key` header, checks the status, and maps the
//! Google error envelope onto the core error taxonomy:
//!
//! | Remote status | Error |
//! |---------------|-------|
//! | `NOT_FOUND` / HTTP 404 | `NotFound` |
//! | `FAILED_PRECONDITION` / HTTP 412 | `PreconditionFailed` |
//! | `INVALID_ARGUMENT` | `InvalidArgument` |
//! | anything else | `Api { code, message }` |
//!
//! Uploads use the resumable protocol: a `start` request carrying the JSON
//! metadata returns an upload URL, and a single `upload, finalize` request
//! sends the bytes and returns the ingestion operation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use file_search_store_core::api::{FileSearchApi, ImportFileRequest, OperationSource, UploadRequest};
use file_search_store_core::client::resolve_api_key;
use file_search_store_core::generation::{GenerateContentRequest, GenerateContentResponse};
use file_search_store_core::models::{
    Document, ListOptions, Operation, Page, Store, STORE_COLLECTION,
};
use file_search_store_core::{Error, FileSearchStoreClient, Result};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use crate::config::Config;

const API_VERSION: &str = "v1beta";
const API_KEY_HEADER: &str = "x-goog-api-key";
const UPLOAD_URL_HEADER: &str = "x-goog-upload-url";

/// Builds the facade over a [`RestApi`] configured from `config`.
///
/// Fails with [`Error::Configuration`] when no API key can be found.
pub fn build_client(config: &Config) -> Result<FileSearchStoreClient> {
    let api_key = resolve_api_key(config.client.api_key.as_deref())?;
    let api = RestApi::new(
        &config.client.base_url,
        api_key,
        Duration::from_secs(config.client.request_timeout_secs),
    )?;
    Ok(FileSearchStoreClient::new(
        Arc::new(api),
        config.client_options(),
    ))
}

pub struct RestApi {
    http: Client,
    base_url: Url,
    api_key: String,
}

impl RestApi {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::Configuration("API key must not be empty".to_string()));
        }
        let mut base_url = Url::parse(base_url)
            .map_err(|e| Error::Configuration(format!("invalid base URL {}: {}", base_url, e)))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    // ============ URL building ============

    /// `{base}/v1beta/{suffix}`
    fn url(&self, suffix: &str) -> Result<Url> {
        let suffix = format!("{}/{}", API_VERSION, suffix.trim_start_matches('/'));
        self.base_url
            .join(&suffix)
            .map_err(|e| Error::Configuration(format!("cannot build URL for {}: {}", suffix, e)))
    }

    /// `{base}/upload/v1beta/{suffix}`
    fn upload_url(&self, suffix: &str) -> Result<Url> {
        let suffix = format!("upload/{}/{}", API_VERSION, suffix.trim_start_matches('/'));
        self.base_url
            .join(&suffix)
            .map_err(|e| Error::Configuration(format!("cannot build URL for {}: {}", suffix, e)))
    }

    fn list_url(&self, suffix: &str, options: &ListOptions) -> Result<Url> {
        let mut url = self.url(suffix)?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(size) = options.page_size {
                pairs.append_pair("pageSize", &size.to_string());
            }
            if let Some(token) = options.page_token.as_deref().filter(|t| !t.is_empty()) {
                pairs.append_pair("pageToken", token);
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }

    // ============ Request plumbing ============

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;
        check_response(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(url = %url, "GET");
        let response = self.send(self.http.get(url)).await?;
        decode(response).await
    }

    async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(url = %url, "POST");
        let response = self.send(self.http.post(url).json(body)).await?;
        decode(response).await
    }

    async fn delete(&self, url: Url) -> Result<()> {
        debug!(url = %url, "DELETE");
        self.send(self.http.delete(url)).await?;
        Ok(())
    }
}

async fn check_response(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(map_error(status, &body))
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Transport(e.to_string()))?;
    serde_json::from_slice(&bytes).map_err(|e| Error::Decode(e.to_string()))
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Translates a non-success response into the core error taxonomy.
pub fn map_error(status: StatusCode, body: &str) -> Error {
    let (message, remote_status) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.status),
        Err(_) => (body.trim().to_string(), None),
    };
    let message = if message.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string()
    } else {
        message
    };

    match remote_status.as_deref() {
        Some("NOT_FOUND") => Error::NotFound(message),
        Some("FAILED_PRECONDITION") => Error::PreconditionFailed(message),
        Some("INVALID_ARGUMENT") => Error::InvalidArgument(message),
        _ if status == StatusCode::NOT_FOUND => Error::NotFound(message),
        _ if status == StatusCode::PRECONDITION_FAILED => Error::PreconditionFailed(message),
        _ => Error::Api {
            code: status.as_u16(),
            message,
        },
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreList {
    #[serde(default)]
    file_search_stores: Vec<Store>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentList {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

fn non_empty(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

fn model_resource_name(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

#[async_trait]
impl OperationSource for RestApi {
    #[instrument(skip_all, fields(operation.name = name))]
    async fn get_operation(&self, name: &str) -> Result<Operation> {
        self.get_json(self.url(name)?).await
    }
}

#[async_trait]
impl FileSearchApi for RestApi {
    #[instrument(skip_all, fields(store.display_name = display_name))]
    async fn create_store(&self, display_name: &str) -> Result<Store> {
        let body = json!({ "displayName": display_name });
        self.post_json(self.url(STORE_COLLECTION)?, &body).await
    }

    #[instrument(skip_all, fields(page.size = options.page_size))]
    async fn list_stores(&self, options: &ListOptions) -> Result<Page<Store>> {
        let list: StoreList = self.get_json(self.list_url(STORE_COLLECTION, options)?).await?;
        Ok(Page {
            items: list.file_search_stores,
            next_page_token: non_empty(list.next_page_token),
        })
    }

    #[instrument(skip_all, fields(store.name = name))]
    async fn get_store(&self, name: &str) -> Result<Store> {
        self.get_json(self.url(name)?).await
    }

    #[instrument(skip_all, fields(store.name = name, force))]
    async fn delete_store(&self, name: &str, force: bool) -> Result<()> {
        let mut url = self.url(name)?;
        url.query_pairs_mut()
            .append_pair("force", if force { "true" } else { "false" });
        self.delete(url).await
    }

    #[instrument(skip_all, fields(
        store.name = store,
        file.size = request.content.len(),
        mime.type = %request.mime_type,
    ))]
    async fn upload_to_store(&self, store: &str, request: UploadRequest) -> Result<Operation> {
        let start_url = self.upload_url(&format!("{}:uploadToFileSearchStore", store))?;

        let mut metadata = serde_json::Map::new();
        metadata.insert("mimeType".to_string(), json!(request.mime_type));
        if let Some(name) = &request.display_name {
            metadata.insert("displayName".to_string(), json!(name));
        }
        if let Some(chunking) = &request.chunking_config {
            metadata.insert("chunkingConfig".to_string(), json!(chunking));
        }
        if !request.custom_metadata.is_empty() {
            metadata.insert("customMetadata".to_string(), json!(request.custom_metadata));
        }

        // Step 1: open a resumable upload session
        let start = self
            .send(
                self.http
                    .post(start_url)
                    .header("X-Goog-Upload-Protocol", "resumable")
                    .header("X-Goog-Upload-Command", "start")
                    .header("X-Goog-Upload-Header-Content-Length", request.content.len().to_string())
                    .header("X-Goog-Upload-Header-Content-Type", request.mime_type.as_str())
                    .json(&metadata),
            )
            .await?;
        let session_url = start
            .headers()
            .get(UPLOAD_URL_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::Decode("upload session response has no upload URL".to_string()))
            .and_then(|raw| {
                Url::parse(raw).map_err(|e| Error::Decode(format!("bad upload URL: {}", e)))
            })?;

        // Step 2: send the bytes and finalize
        debug!("uploading content");
        let finished = self
            .send(
                self.http
                    .post(session_url)
                    .header("X-Goog-Upload-Command", "upload, finalize")
                    .header("X-Goog-Upload-Offset", "0")
                    .body(request.content),
            )
            .await?;
        decode(finished).await
    }

    #[instrument(skip_all, fields(store.name = store, file.name = %request.file_name))]
    async fn import_file(&self, store: &str, request: ImportFileRequest) -> Result<Operation> {
        let url = self.url(&format!("{}:importFile", store))?;
        self.post_json(url, &request).await
    }

    #[instrument(skip_all, fields(store.name = store, page.size = options.page_size))]
    async fn list_documents(&self, store: &str, options: &ListOptions) -> Result<Page<Document>> {
        let suffix = format!("{}/documents", store);
        let list: DocumentList = self.get_json(self.list_url(&suffix, options)?).await?;
        Ok(Page {
            items: list.documents,
            next_page_token: non_empty(list.next_page_token),
        })
    }

    #[instrument(skip_all, fields(document.name = name))]
    async fn get_document(&self, name: &str) -> Result<Document> {
        self.get_json(self.url(name)?).await
    }

    #[instrument(skip_all, fields(document.name = name))]
    async fn delete_document(&self, name: &str) -> Result<()> {
        self.delete(self.url(name)?).await
    }

    #[instrument(skip_all, fields(model = model, contents = request.contents.len()))]
    async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse> {
        let url = self.url(&format!("{}:generateContent", model_resource_name(model)))?;
        self.post_json(url, request).await
    }
}
