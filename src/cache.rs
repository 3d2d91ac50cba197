//! Short-lived response cache for the HTTP adapter.
//!
//! Listings are expensive (every store listing may fan out into one
//! document listing per store), so the server keeps recent results for a
//! fixed TTL. Entries are JSON values keyed by string; writes that change
//! remote state invalidate by key prefix. The cache is never authoritative.

use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Key for the all-stores listing.
pub fn stores_key(include_document_counts: bool) -> String {
    format!("stores:list:{}", include_document_counts)
}

/// Prefix shared by both store-listing keys.
pub const STORES_PREFIX: &str = "stores:";

/// Key for one store's document listing.
pub fn documents_key(store: &str) -> String {
    format!("docs:{}", store)
}

struct Entry {
    value: Value,
    expires_at: Instant,
}

pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<String, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value if present and not expired.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|e| e.expires_at > Instant::now())
            .map(|e| e.value.clone())
    }

    pub async fn put(&self, key: impl Into<String>, value: Value) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + self.ttl,
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, e| e.expires_at > Instant::now());
        entries.insert(key.into(), entry);
    }

    /// Drops every key starting with `prefix`, or everything for `None`.
    pub async fn invalidate(&self, prefix: Option<&str>) {
        let mut entries = self.entries.write().await;
        match prefix {
            Some(prefix) => entries.retain(|key, _| !key.starts_with(prefix)),
            None => entries.clear(),
        }
    }
}
