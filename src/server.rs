//! JSON HTTP API over the file-search client.
//!
//! Backs a browser dashboard: store and document management plus grounded
//! queries. Every handler is a thin adapter over [`FileSearchStoreClient`];
//! listings are served through a [`ResponseCache`] that write handlers
//! invalidate.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `POST`   | `/api/stores` | Create a store (`201`) |
//! | `GET`    | `/api/stores` | List all stores, optionally with document counts |
//! | `GET`    | `/api/stores/{id}` | Get one store |
//! | `DELETE` | `/api/stores/{id}` | Delete a store (`?force=true` cascades) |
//! | `POST`   | `/api/stores/{id}/documents` | Multipart upload (`201`) |
//! | `GET`    | `/api/stores/{id}/documents` | List all documents of a store |
//! | `GET`    | `/api/stores/{id}/documents/{doc}` | Get one document |
//! | `DELETE` | `/api/stores/{id}/documents/{doc}` | Delete a document |
//! | `POST`   | `/api/query` | Grounded query with citations |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Missing or malformed input is `400`. Every other failure, remote or
//! local, is `500` with the error's kind as `code`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted.

use axum::{
    extract::{
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use file_search_store_core::documents::{IngestOptions, UploadSource};
use file_search_store_core::generation::GenerationConfig;
use file_search_store_core::models::{store_resource_name, ChunkingConfig, CustomMetadata};
use file_search_store_core::query::QueryOptions;
use file_search_store_core::{Error, FileSearchStoreClient};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::cache::{documents_key, stores_key, ResponseCache, STORES_PREFIX};
use crate::config::Config;
use crate::rest::build_client;

/// Largest accepted request body; uploads arrive inline.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    client: FileSearchStoreClient,
    cache: Arc<ResponseCache>,
}

impl AppState {
    pub fn new(client: FileSearchStoreClient, cache_ttl: Duration) -> Self {
        Self {
            client,
            cache: Arc::new(ResponseCache::new(cache_ttl)),
        }
    }
}

/// Builds the router with CORS applied. Exposed for embedding and tests.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/api/stores", post(handle_create_store).get(handle_list_stores))
        .route(
            "/api/stores/{id}",
            get(handle_get_store).delete(handle_delete_store),
        )
        .route(
            "/api/stores/{id}/documents",
            post(handle_upload_document).get(handle_list_documents),
        )
        .route(
            "/api/stores/{id}/documents/{doc}",
            get(handle_get_document).delete(handle_delete_document),
        )
        .route("/api/query", post(handle_query))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `bind` (or `[server].bind`).
///
/// Builds the REST-backed client first, so a missing API key fails before
/// the listener is opened. Runs until the process is terminated.
pub async fn run_server(config: &Config, bind: Option<&str>) -> anyhow::Result<()> {
    let client = build_client(config)?;
    let state = AppState::new(client, Duration::from_secs(config.server.cache_ttl_secs));
    let bind_addr = bind.unwrap_or(&config.server.bind).to_string();

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %bind_addr, "server listening");
    println!("Listening on http://{}", bind_addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        let kind = err.kind();
        let status = if kind.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        if status.is_server_error() {
            warn!(code = kind.code(), error = %err, "request failed");
        }
        AppError {
            status,
            code: kind.code().to_string(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

/// Query-string flags are on only when spelled exactly `true`.
fn flag(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Constructs a 400 Bad Request error.
fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

type ApiResult<T> = Result<T, AppError>;

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ Stores ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStoreRequest {
    #[serde(default)]
    display_name: Option<String>,
}

async fn handle_create_store(
    State(state): State<AppState>,
    body: Result<Json<CreateStoreRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = body?;
    let display_name = req
        .display_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| bad_request("displayName is required"))?;

    let store = state.client.create_store(&display_name).await?;
    state.cache.invalidate(None).await;
    Ok((StatusCode::CREATED, Json(json!(store))))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListStoresQuery {
    #[serde(default)]
    include_document_counts: Option<String>,
}

async fn handle_list_stores(
    State(state): State<AppState>,
    params: Result<Query<ListStoresQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    let include_counts = flag(params.include_document_counts.as_deref());
    let key = stores_key(include_counts);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(Json(cached));
    }

    let mut stores = state.client.list_all_stores().await?;
    if include_counts {
        for store in &mut stores {
            let count = match state.client.list_all_documents(&store.name).await {
                Ok(docs) => docs.len() as u64,
                Err(err) => {
                    warn!(store = %store.name, error = %err, "document count unavailable");
                    0
                }
            };
            store.document_count = Some(count);
        }
    }

    let body = json!({ "stores": stores });
    state.cache.put(key, body.clone()).await;
    Ok(Json(body))
}

async fn handle_get_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = state.client.get_store(&store_resource_name(&id)).await?;
    Ok(Json(json!(store)))
}

#[derive(Deserialize)]
struct DeleteStoreQuery {
    #[serde(default)]
    force: Option<String>,
}

async fn handle_delete_store(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<DeleteStoreQuery>, QueryRejection>,
) -> ApiResult<Json<Value>> {
    let Query(params) = params?;
    state
        .client
        .delete_store(&store_resource_name(&id), flag(params.force.as_deref()))
        .await?;
    state.cache.invalidate(None).await;
    Ok(Json(json!({ "success": true })))
}

// ============ Documents ============

/// Collects the multipart upload form into client inputs.
async fn read_upload_form(mut form: Multipart) -> ApiResult<(UploadSource, IngestOptions)> {
    let mut source: Option<UploadSource> = None;
    let mut explicit_mime: Option<String> = None;
    let mut options = IngestOptions::default();
    let mut chunking = ChunkingConfig::default();

    while let Some(field) = form
        .next_field()
        .await
        .map_err(|e| bad_request(format!("invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let part_type = field
                    .content_type()
                    .map(str::to_string)
                    .filter(|t| !t.is_empty() && t != "application/octet-stream");
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| bad_request(format!("failed to read file: {}", e)))?;
                source = Some(UploadSource {
                    content: content.to_vec(),
                    file_name,
                    mime_type: part_type,
                });
            }
            "displayName" => {
                options.display_name = Some(field_text(field).await?).filter(|s| !s.is_empty());
            }
            "mimeType" => {
                explicit_mime = Some(field_text(field).await?).filter(|s| !s.is_empty());
            }
            "maxTokensPerChunk" => {
                chunking.max_tokens_per_chunk = parse_u32(&name, &field_text(field).await?)?;
            }
            "maxOverlapTokens" => {
                chunking.max_overlap_tokens = parse_u32(&name, &field_text(field).await?)?;
            }
            "metadata" => {
                let raw = field_text(field).await?;
                if !raw.is_empty() {
                    options.custom_metadata = serde_json::from_str::<Vec<CustomMetadata>>(&raw)
                        .map_err(|e| bad_request(format!("metadata must be a JSON array: {}", e)))?;
                }
            }
            _ => {}
        }
    }

    let mut source = source.ok_or_else(|| bad_request("file is required"))?;
    if explicit_mime.is_some() {
        source.mime_type = explicit_mime;
    }
    if chunking != ChunkingConfig::default() {
        options.chunking_config = Some(chunking);
    }
    Ok((source, options))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> ApiResult<String> {
    field
        .text()
        .await
        .map(|s| s.trim().to_string())
        .map_err(|e| bad_request(format!("invalid form field: {}", e)))
}

fn parse_u32(name: &str, raw: &str) -> ApiResult<Option<u32>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u32>()
        .map(Some)
        .map_err(|_| bad_request(format!("{} must be a non-negative integer", name)))
}

async fn handle_upload_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let store = store_resource_name(&id);
    let (source, options) = read_upload_form(form?).await?;

    let document = state
        .client
        .upload_document(&store, source, &options)
        .await?;
    state.cache.invalidate(Some(&documents_key(&store))).await;
    state.cache.invalidate(Some(STORES_PREFIX)).await;
    Ok((StatusCode::CREATED, Json(json!(document))))
}

async fn handle_list_documents(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let store = store_resource_name(&id);
    let key = documents_key(&store);
    if let Some(cached) = state.cache.get(&key).await {
        return Ok(Json(cached));
    }

    let documents = state.client.list_all_documents(&store).await?;
    let body = json!({ "documents": documents });
    state.cache.put(key, body.clone()).await;
    Ok(Json(body))
}

fn document_name(store_id: &str, doc_id: &str) -> String {
    format!("{}/documents/{}", store_resource_name(store_id), doc_id)
}

async fn handle_get_document(
    State(state): State<AppState>,
    Path((id, doc)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    let document = state.client.get_document(&document_name(&id, &doc)).await?;
    Ok(Json(json!(document)))
}

async fn handle_delete_document(
    State(state): State<AppState>,
    Path((id, doc)): Path<(String, String)>,
) -> ApiResult<Json<Value>> {
    state.client.delete_document(&document_name(&id, &doc)).await?;
    state
        .cache
        .invalidate(Some(&documents_key(&store_resource_name(&id))))
        .await;
    state.cache.invalidate(Some(STORES_PREFIX)).await;
    Ok(Json(json!({ "success": true })))
}

// ============ POST /api/query ============

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest {
    #[serde(default)]
    store_names: Vec<String>,
    #[serde(default)]
    query: String,
    model: Option<String>,
    metadata_filter: Option<String>,
    system_instruction: Option<String>,
    retrieval_top_k: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    top_k: Option<i32>,
    max_output_tokens: Option<i32>,
    stop_sequences: Option<Vec<String>>,
    presence_penalty: Option<f32>,
    frequency_penalty: Option<f32>,
    seed: Option<i64>,
    response_mime_type: Option<String>,
}

async fn handle_query(
    State(state): State<AppState>,
    body: Result<Json<QueryRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let Json(req) = body?;
    if req.store_names.is_empty() {
        return Err(bad_request("storeNames must contain at least one store"));
    }
    if req.query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let stores: Vec<String> = req
        .store_names
        .iter()
        .map(|s| store_resource_name(s))
        .collect();
    let options = QueryOptions {
        model: req.model,
        metadata_filter: req.metadata_filter,
        system_instruction: req.system_instruction,
        retrieval_top_k: req.retrieval_top_k,
        generation: GenerationConfig {
            temperature: req.temperature,
            top_p: req.top_p,
            top_k: req.top_k,
            max_output_tokens: req.max_output_tokens,
            stop_sequences: req.stop_sequences,
            presence_penalty: req.presence_penalty,
            frequency_penalty: req.frequency_penalty,
            seed: req.seed,
            response_mime_type: req.response_mime_type,
        },
    };

    let result = state.client.query(&stores, &req.query, &options).await?;
    Ok(Json(json!({
        "text": result.text,
        "citations": result.citations,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_name_from_ids() {
        assert_eq!(
            document_name("abc", "doc-1"),
            "fileSearchStores/abc/documents/doc-1"
        );
    }

    #[test]
    fn test_parse_u32_field() {
        assert_eq!(parse_u32("maxTokensPerChunk", "").ok().flatten(), None);
        assert_eq!(parse_u32("maxTokensPerChunk", "200").ok().flatten(), Some(200));
        let err = parse_u32("maxTokensPerChunk", "-3").err().unwrap();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_flag_is_true_only_for_literal_true() {
        assert!(flag(Some("true")));
        assert!(!flag(Some("yes")));
        assert!(!flag(Some("1")));
        assert!(!flag(Some("TRUE")));
        assert!(!flag(None));
    }

    #[test]
    fn test_core_errors_map_to_status() {
        let err = AppError::from(Error::InvalidArgument("x".into()));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");

        let err = AppError::from(Error::NotFound("x".into()));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code, "not_found");
    }
}
