//! Store lifecycle: create, list, get, delete.

use std::sync::Arc;

use tracing::info;

use crate::api::FileSearchApi;
use crate::error::{Error, Result};
use crate::models::{ListOptions, Page, Store};

/// Thin request-shaping layer over [`FileSearchApi`] for stores.
#[derive(Clone)]
pub struct StoreManager {
    api: Arc<dyn FileSearchApi>,
}

impl StoreManager {
    pub fn new(api: Arc<dyn FileSearchApi>) -> Self {
        Self { api }
    }

    pub async fn create(&self, display_name: &str) -> Result<Store> {
        if display_name.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "store display name must not be empty".to_string(),
            ));
        }
        let store = self.api.create_store(display_name).await?;
        info!(store = %store.name, "created store");
        Ok(store)
    }

    pub async fn list(&self, options: &ListOptions) -> Result<Page<Store>> {
        self.api.list_stores(options).await
    }

    /// Follows page tokens until the listing is exhausted.
    pub async fn list_all(&self) -> Result<Vec<Store>> {
        let mut stores = Vec::new();
        let mut options = ListOptions::default();
        loop {
            let page = self.api.list_stores(&options).await?;
            stores.extend(page.items);
            match page.next_page_token {
                Some(token) if !token.is_empty() => options.page_token = Some(token),
                _ => return Ok(stores),
            }
        }
    }

    pub async fn get(&self, name: &str) -> Result<Store> {
        self.api.get_store(name).await
    }

    /// Without `force`, a store that still holds documents is refused with
    /// [`Error::PreconditionFailed`]. With it, child documents go too.
    pub async fn delete(&self, name: &str, force: bool) -> Result<()> {
        self.api.delete_store(name, force).await?;
        info!(store = %name, force, "deleted store");
        Ok(())
    }
}
