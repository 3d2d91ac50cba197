//! CLI command implementations.
//!
//! Each function prints its result to stdout and returns an error for the
//! binary to report; nothing here exits the process.

use anyhow::{bail, Context, Result};
use file_search_store_core::documents::{IngestOptions, UploadSource};
use file_search_store_core::models::{ChunkingConfig, CustomMetadata, ListOptions};
use file_search_store_core::poll::PollOptions;
use file_search_store_core::query::QueryOptions;
use file_search_store_core::FileSearchStoreClient;
use std::path::Path;

use crate::output::{documents_table, query_text, stores_table};

/// Parses a `key=value` metadata argument.
///
/// The value becomes numeric when it is non-blank and parses as a finite
/// number after trimming; anything else is kept as a string.
pub fn parse_metadata(raw: &str) -> Result<CustomMetadata> {
    let Some((key, value)) = raw.split_once('=') else {
        bail!("invalid metadata '{}': expected key=value", raw);
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("invalid metadata '{}': key must not be empty", raw);
    }

    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if !trimmed.is_empty() && n.is_finite() => Ok(CustomMetadata::numeric(key, n)),
        _ => Ok(CustomMetadata::string(key, value)),
    }
}

/// Shared ingestion flags, already parsed.
#[derive(Debug, Default)]
pub struct IngestArgs {
    pub display_name: Option<String>,
    pub max_tokens: Option<u32>,
    pub overlap: Option<u32>,
    pub metadata: Vec<String>,
    pub poll_interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

impl IngestArgs {
    fn into_options(self, defaults: PollOptions) -> Result<IngestOptions> {
        let chunking_config = if self.max_tokens.is_some() || self.overlap.is_some() {
            Some(ChunkingConfig {
                max_tokens_per_chunk: self.max_tokens,
                max_overlap_tokens: self.overlap,
            })
        } else {
            None
        };
        let custom_metadata = self
            .metadata
            .iter()
            .map(|m| parse_metadata(m))
            .collect::<Result<Vec<_>>>()?;
        let poll = if self.poll_interval_ms.is_some() || self.timeout_ms.is_some() {
            Some(PollOptions::from_millis(
                self.poll_interval_ms
                    .unwrap_or(defaults.interval.as_millis() as u64),
                self.timeout_ms.unwrap_or(defaults.timeout.as_millis() as u64),
            ))
        } else {
            None
        };
        if let Some(p) = &poll {
            if p.interval.is_zero() {
                bail!("--poll-interval-ms must be > 0");
            }
        }

        Ok(IngestOptions {
            display_name: self.display_name,
            chunking_config,
            custom_metadata,
            poll,
        })
    }
}

fn page_options(page_size: Option<u32>, page_token: Option<String>) -> ListOptions {
    ListOptions {
        page_size,
        page_token,
    }
}

// ============ Stores ============

pub async fn store_create(client: &FileSearchStoreClient, name: &str) -> Result<()> {
    let store = client.create_store(name).await?;
    println!(
        "Created store: {} ({})",
        store.display_name.as_deref().unwrap_or(name),
        store.name
    );
    Ok(())
}

pub async fn store_list(
    client: &FileSearchStoreClient,
    page_size: Option<u32>,
    page_token: Option<String>,
    json: bool,
) -> Result<()> {
    let page = client
        .list_stores(&page_options(page_size, page_token))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }
    if page.items.is_empty() {
        println!("No stores found.");
    } else {
        println!("{}", stores_table(&page.items));
    }
    if let Some(token) = page.next_page_token {
        println!("\nNext page token: {}", token);
    }
    Ok(())
}

pub async fn store_get(client: &FileSearchStoreClient, name: &str) -> Result<()> {
    let store = client.get_store(name).await?;
    println!("{}", serde_json::to_string_pretty(&store)?);
    Ok(())
}

pub async fn store_delete(client: &FileSearchStoreClient, name: &str, force: bool) -> Result<()> {
    client.delete_store(name, force).await?;
    println!("Deleted store: {}", name);
    Ok(())
}

// ============ Documents ============

pub async fn doc_upload(
    client: &FileSearchStoreClient,
    store: &str,
    file: &Path,
    mime_type: Option<String>,
    args: IngestArgs,
    poll_defaults: PollOptions,
) -> Result<()> {
    let content = std::fs::read(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let source = UploadSource {
        content,
        file_name: Some(file.to_string_lossy().into_owned()),
        mime_type,
    };
    let options = args.into_options(poll_defaults)?;

    println!("Uploading {} ...", file.display());
    let document = client.upload_document(store, source, &options).await?;
    println!("Uploaded: {} ({})", document.name, document.state);
    Ok(())
}

pub async fn doc_import(
    client: &FileSearchStoreClient,
    store: &str,
    file_name: &str,
    args: IngestArgs,
    poll_defaults: PollOptions,
) -> Result<()> {
    let options = args.into_options(poll_defaults)?;

    println!("Importing {} ...", file_name);
    let document = client.import_document(store, file_name, &options).await?;
    println!("Imported: {} ({})", document.name, document.state);
    Ok(())
}

pub async fn doc_list(
    client: &FileSearchStoreClient,
    store: &str,
    page_size: Option<u32>,
    page_token: Option<String>,
    json: bool,
) -> Result<()> {
    let page = client
        .list_documents(store, &page_options(page_size, page_token))
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }
    if page.items.is_empty() {
        println!("No documents found.");
    } else {
        println!("{}", documents_table(&page.items));
    }
    if let Some(token) = page.next_page_token {
        println!("\nNext page token: {}", token);
    }
    Ok(())
}

pub async fn doc_get(client: &FileSearchStoreClient, name: &str) -> Result<()> {
    let document = client.get_document(name).await?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

pub async fn doc_delete(client: &FileSearchStoreClient, name: &str) -> Result<()> {
    client.delete_document(name).await?;
    println!("Deleted document: {}", name);
    Ok(())
}

// ============ Query ============

pub async fn query(
    client: &FileSearchStoreClient,
    stores: &[String],
    question: &str,
    options: &QueryOptions,
    show_citations: bool,
    json: bool,
) -> Result<()> {
    if stores.is_empty() {
        bail!("at least one --store is required");
    }
    if question.is_empty() {
        bail!("query must not be empty");
    }

    let result = client.query(stores, question, options).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", query_text(&result, show_citations));
    }
    Ok(())
}
