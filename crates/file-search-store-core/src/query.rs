//! Grounded question answering over one or more stores.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::api::FileSearchApi;
use crate::citation::reconstruct_citations;
use crate::error::{Error, Result};
use crate::generation::{
    Content, FileSearchTool, GenerateContentRequest, GenerationConfig, Tool,
};
use crate::models::QueryResult;

/// Default generation model when neither the caller nor the client sets one.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Everything a query can carry besides the stores and the question.
///
/// Every field is optional. Unset fields are omitted from the request so
/// the remote defaults apply; nothing is defaulted locally except `model`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOptions {
    pub model: Option<String>,
    /// Opaque filter expression, forwarded verbatim.
    pub metadata_filter: Option<String>,
    pub system_instruction: Option<String>,
    /// Number of chunks the file-search tool retrieves.
    pub retrieval_top_k: Option<u32>,
    pub generation: GenerationConfig,
}

#[derive(Clone)]
pub struct QueryEngine {
    api: Arc<dyn FileSearchApi>,
    default_model: String,
}

impl QueryEngine {
    pub fn new(api: Arc<dyn FileSearchApi>, default_model: impl Into<String>) -> Self {
        Self {
            api,
            default_model: default_model.into(),
        }
    }

    /// Asks `query` against `store_names` and returns the answer with its
    /// citations. Issues exactly one generation call.
    #[instrument(skip_all, fields(stores = store_names.len()))]
    pub async fn query(
        &self,
        store_names: &[String],
        query: &str,
        options: &QueryOptions,
    ) -> Result<QueryResult> {
        if store_names.is_empty() {
            return Err(Error::InvalidArgument(
                "at least one store name is required".to_string(),
            ));
        }
        if query.is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".to_string()));
        }

        let model = options
            .model
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.default_model);
        let request = build_request(store_names, query, options);

        debug!(model, "sending grounded generation request");
        let response = self.api.generate_content(model, &request).await?;

        let text = response.text();
        let citations = reconstruct_citations(response.grounding_metadata());
        debug!(chars = text.len(), citations = citations.len(), "query answered");

        Ok(QueryResult {
            text,
            citations,
            raw_response: response,
        })
    }
}

/// Shapes the `generateContent` body for a grounded query.
pub fn build_request(
    store_names: &[String],
    query: &str,
    options: &QueryOptions,
) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content::user_text(query)],
        tools: vec![Tool {
            file_search: Some(FileSearchTool {
                file_search_store_names: store_names.to_vec(),
                metadata_filter: options.metadata_filter.clone(),
                top_k: options.retrieval_top_k,
            }),
        }],
        system_instruction: options
            .system_instruction
            .as_ref()
            .map(|s| Content::system_text(s.clone())),
        generation_config: if options.generation.is_empty() {
            None
        } else {
            Some(options.generation.clone())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::memory::InMemoryApi;
    use crate::generation::GenerateContentResponse;
    use serde_json::json;

    fn grounded_response() -> GenerateContentResponse {
        serde_json::from_value(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "Paris is the capital of France."}]},
                "groundingMetadata": {
                    "groundingChunks": [
                        {"retrievedContext": {"uri": "a", "title": "A", "text": "snippet A"}},
                        {"retrievedContext": {"uri": "b", "title": "B", "text": "snippet B"}},
                        {"retrievedContext": {"uri": "c", "title": "C", "text": "snippet C"}}
                    ],
                    "groundingSupports": [
                        {"segment": {"startIndex": 0, "endIndex": 10}, "groundingChunkIndices": [0]},
                        {"segment": {"startIndex": 11, "endIndex": 20}, "groundingChunkIndices": [1, 2]}
                    ]
                }
            }]
        }))
        .unwrap()
    }

    async fn engine(response: GenerateContentResponse) -> (Arc<InMemoryApi>, QueryEngine, String) {
        let api = Arc::new(InMemoryApi::new().with_generate_response(response));
        let store = api.create_store("kb").await.unwrap();
        let engine = QueryEngine::new(api.clone(), DEFAULT_MODEL);
        (api, engine, store.name)
    }

    #[tokio::test]
    async fn test_query_reconstructs_citations() {
        let (_, engine, store) = engine(grounded_response()).await;

        let result = engine
            .query(&[store], "capital of France?", &QueryOptions::default())
            .await
            .unwrap();

        assert_eq!(result.text, "Paris is the capital of France.");
        assert_eq!(result.citations.len(), 3);
        assert_eq!(result.citations[0].start_index, Some(0));
        assert_eq!(result.citations[0].end_index, Some(10));
        for c in &result.citations[1..] {
            assert_eq!(c.start_index, Some(11));
            assert_eq!(c.end_index, Some(20));
        }
        assert_eq!(result.citations[2].snippet.as_deref(), Some("snippet C"));
    }

    #[tokio::test]
    async fn test_query_without_grounding_has_no_citations() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{"content": {"parts": [{"text": "No idea."}]}}]
        }))
        .unwrap();
        let (_, engine, store) = engine(response).await;

        let result = engine
            .query(&[store], "anything", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text, "No idea.");
        assert!(result.citations.is_empty());
    }

    #[tokio::test]
    async fn test_query_validates_inputs() {
        let (api, engine, store) = engine(GenerateContentResponse::default()).await;

        let err = engine
            .query(&[], "q", &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        let err = engine
            .query(&[store.clone()], "", &QueryOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(api.generate_requests().is_empty());

        // Only an empty query is rejected; whitespace goes to the model.
        engine
            .query(&[store], "   ", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(api.generate_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_query_forwards_options_verbatim() {
        let (api, engine, store) = engine(GenerateContentResponse::default()).await;
        let options = QueryOptions {
            model: Some("gemini-2.5-pro".to_string()),
            metadata_filter: Some("author = \"lin\"".to_string()),
            system_instruction: Some("Be brief.".to_string()),
            retrieval_top_k: Some(4),
            generation: GenerationConfig {
                temperature: Some(0.2),
                seed: Some(42),
                stop_sequences: Some(vec!["END".to_string()]),
                ..Default::default()
            },
        };

        engine.query(&[store.clone()], "q", &options).await.unwrap();

        let (model, request) = api.generate_requests().remove(0);
        assert_eq!(model, "gemini-2.5-pro");
        let tool = request.tools[0].file_search.as_ref().unwrap();
        assert_eq!(tool.file_search_store_names, vec![store]);
        assert_eq!(tool.metadata_filter.as_deref(), Some("author = \"lin\""));
        assert_eq!(tool.top_k, Some(4));
        assert_eq!(request.generation_config, Some(options.generation.clone()));
        assert!(request.system_instruction.is_some());
    }

    #[tokio::test]
    async fn test_query_uses_default_model_and_omits_empty_config() {
        let (api, engine, store) = engine(GenerateContentResponse::default()).await;
        let result = engine
            .query(&[store], "q", &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(result.text, "");

        let (model, request) = api.generate_requests().remove(0);
        assert_eq!(model, DEFAULT_MODEL);
        assert!(request.generation_config.is_none());
        assert!(request.system_instruction.is_none());
    }
}
