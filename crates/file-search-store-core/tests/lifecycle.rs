//! End-to-end lifecycle through the facade, backed by the in-memory API.

use std::sync::Arc;

use file_search_store_core::api::memory::InMemoryApi;
use file_search_store_core::documents::{IngestOptions, UploadSource};
use file_search_store_core::models::{CustomMetadata, DocumentState, ListOptions, MetadataValue};
use file_search_store_core::poll::PollOptions;
use file_search_store_core::{ClientOptions, Error, FileSearchStoreClient};

fn client(api: Arc<InMemoryApi>) -> FileSearchStoreClient {
    FileSearchStoreClient::new(
        api,
        ClientOptions {
            poll: PollOptions::from_millis(5, 1_000),
            ..Default::default()
        },
    )
}

fn source(name: &str, body: &str) -> UploadSource {
    UploadSource {
        content: body.as_bytes().to_vec(),
        file_name: Some(name.to_string()),
        mime_type: None,
    }
}

#[tokio::test(start_paused = true)]
async fn force_delete_removes_store_and_documents() {
    let api = Arc::new(InMemoryApi::new().with_polls_until_done(2));
    let client = client(api.clone());

    let store = client.create_store("handbook").await.unwrap();
    let doc = client
        .upload_document(&store.name, source("intro.txt", "welcome"), &IngestOptions::default())
        .await
        .unwrap();
    assert_eq!(doc.state, DocumentState::Active);

    let err = client.delete_store(&store.name, false).await.unwrap_err();
    assert!(matches!(err, Error::PreconditionFailed(_)));
    assert!(client.get_store(&store.name).await.is_ok());

    client.delete_store(&store.name, true).await.unwrap();

    assert!(matches!(
        client.get_store(&store.name).await.unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        client
            .list_documents(&store.name, &ListOptions::default())
            .await
            .unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(matches!(
        client.get_document(&doc.name).await.unwrap_err(),
        Error::NotFound(_)
    ));
}

#[tokio::test]
async fn metadata_survives_upload_then_get() {
    let api = Arc::new(InMemoryApi::new());
    let client = client(api);

    let store = client.create_store("papers").await.unwrap();
    let options = IngestOptions {
        custom_metadata: vec![
            CustomMetadata::string("year", "2024"),
            CustomMetadata::numeric("pages", 12.0),
        ],
        ..Default::default()
    };
    let uploaded = client
        .upload_document(&store.name, source("paper.pdf", "%PDF"), &options)
        .await
        .unwrap();

    let fetched = client.get_document(&uploaded.name).await.unwrap();
    assert_eq!(fetched.custom_metadata.len(), 2);
    assert_eq!(
        fetched.custom_metadata[0].value,
        Some(MetadataValue::String("2024".to_string()))
    );
    assert_eq!(
        fetched.custom_metadata[1].value,
        Some(MetadataValue::Numeric(12.0))
    );
    assert_eq!(fetched.mime_type.as_deref(), Some("application/pdf"));
}

#[tokio::test]
async fn listing_pages_through_documents() {
    let api = Arc::new(InMemoryApi::new());
    let client = client(api);
    let store = client.create_store("many").await.unwrap();

    for i in 0..12 {
        client
            .upload_document(
                &store.name,
                source(&format!("f{}.txt", i), "x"),
                &IngestOptions::default(),
            )
            .await
            .unwrap();
    }

    let first = client
        .list_documents(
            &store.name,
            &ListOptions {
                page_size: Some(5),
                page_token: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.items.len(), 5);
    assert!(first.next_page_token.is_some());

    let all = client.list_all_documents(&store.name).await.unwrap();
    assert_eq!(all.len(), 12);

    let view = client.get_store(&store.name).await.unwrap();
    assert_eq!(view.active_documents_count, Some(12));
}
