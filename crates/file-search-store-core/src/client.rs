//! Facade bundling the store manager, document manager, and query engine
//! behind one explicitly constructed client.

use std::sync::Arc;

use crate::api::FileSearchApi;
use crate::documents::{DocumentManager, IngestOptions, UploadSource};
use crate::error::{Error, Result};
use crate::models::{Document, ListOptions, Page, QueryResult, Store};
use crate::poll::PollOptions;
use crate::query::{QueryEngine, QueryOptions, DEFAULT_MODEL};
use crate::stores::StoreManager;

/// Environment variables consulted for the API key, in order.
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Returns the explicit key if non-blank, otherwise the first non-blank
/// environment variable from [`API_KEY_ENV_VARS`].
///
/// Fails with [`Error::Configuration`] when nothing is found.
pub fn resolve_api_key(explicit: Option<&str>) -> Result<String> {
    resolve_api_key_with(explicit, |var| std::env::var(var).ok())
}

/// [`resolve_api_key`] with an injectable environment lookup.
pub fn resolve_api_key_with<F>(explicit: Option<&str>, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(API_KEY_ENV_VARS.iter().filter_map(|var| lookup(var)))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
        .ok_or_else(|| {
            Error::Configuration(format!(
                "no API key configured; set {} or {}",
                API_KEY_ENV_VARS[0], API_KEY_ENV_VARS[1]
            ))
        })
}

/// Construction-time settings for [`FileSearchStoreClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub default_model: String,
    pub poll: PollOptions,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            poll: PollOptions::default(),
        }
    }
}

/// Single entry point for store, document, and query operations.
///
/// Cheap to clone; every clone shares the same underlying API handle.
#[derive(Clone)]
pub struct FileSearchStoreClient {
    api: Arc<dyn FileSearchApi>,
    stores: StoreManager,
    documents: DocumentManager,
    query: QueryEngine,
}

impl FileSearchStoreClient {
    pub fn new(api: Arc<dyn FileSearchApi>, options: ClientOptions) -> Self {
        Self {
            stores: StoreManager::new(api.clone()),
            documents: DocumentManager::new(api.clone(), options.poll),
            query: QueryEngine::new(api.clone(), options.default_model),
            api,
        }
    }

    /// The underlying transport.
    pub fn api(&self) -> &Arc<dyn FileSearchApi> {
        &self.api
    }

    // ============ Stores ============

    pub async fn create_store(&self, display_name: &str) -> Result<Store> {
        self.stores.create(display_name).await
    }

    pub async fn list_stores(&self, options: &ListOptions) -> Result<Page<Store>> {
        self.stores.list(options).await
    }

    pub async fn list_all_stores(&self) -> Result<Vec<Store>> {
        self.stores.list_all().await
    }

    pub async fn get_store(&self, name: &str) -> Result<Store> {
        self.stores.get(name).await
    }

    pub async fn delete_store(&self, name: &str, force: bool) -> Result<()> {
        self.stores.delete(name, force).await
    }

    // ============ Documents ============

    pub async fn upload_document(
        &self,
        store: &str,
        source: UploadSource,
        options: &IngestOptions,
    ) -> Result<Document> {
        self.documents.upload(store, source, options).await
    }

    pub async fn import_document(
        &self,
        store: &str,
        file_name: &str,
        options: &IngestOptions,
    ) -> Result<Document> {
        self.documents.import(store, file_name, options).await
    }

    pub async fn list_documents(&self, store: &str, options: &ListOptions) -> Result<Page<Document>> {
        self.documents.list(store, options).await
    }

    pub async fn list_all_documents(&self, store: &str) -> Result<Vec<Document>> {
        self.documents.list_all(store).await
    }

    pub async fn get_document(&self, name: &str) -> Result<Document> {
        self.documents.get(name).await
    }

    pub async fn delete_document(&self, name: &str) -> Result<()> {
        self.documents.delete(name).await
    }

    // ============ Query ============

    pub async fn query(
        &self,
        store_names: &[String],
        query: &str,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        self.query.query(store_names, query, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_key_wins() {
        let key = resolve_api_key_with(Some("explicit"), |_| Some("env".to_string())).unwrap();
        assert_eq!(key, "explicit");
    }

    #[test]
    fn test_gemini_key_before_google_key() {
        let key = resolve_api_key_with(None, |var| match var {
            "GEMINI_API_KEY" => Some("gemini".to_string()),
            "GOOGLE_API_KEY" => Some("google".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(key, "gemini");

        let key = resolve_api_key_with(Some(" "), |var| {
            (var == "GOOGLE_API_KEY").then(|| "google".to_string())
        })
        .unwrap();
        assert_eq!(key, "google");
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let err = resolve_api_key_with(None, |_| None).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }
}
