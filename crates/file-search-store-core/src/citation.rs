//! Citation reconstruction from grounding metadata.
//!
//! The remote reports retrieved chunks and supported answer spans as two
//! parallel lists, linked only by index. This module turns them into one
//! [`Citation`] per chunk, in chunk order.

use crate::generation::GroundingMetadata;
use crate::models::Citation;

/// Builds citations from grounding metadata.
///
/// Pass one emits a citation per grounding chunk carrying the retrieved
/// context's uri, title, and text (as `snippet`). Pass two walks the
/// supports: each support with a segment writes its `(start, end)` onto
/// every citation it points at. A missing `startIndex` means 0. When
/// several supports hit the same chunk, the last one wins. Indices outside
/// the chunk list are ignored.
pub fn reconstruct_citations(metadata: Option<&GroundingMetadata>) -> Vec<Citation> {
    let Some(metadata) = metadata else {
        return Vec::new();
    };

    let mut citations: Vec<Citation> = metadata
        .grounding_chunks
        .iter()
        .flatten()
        .map(|chunk| {
            let ctx = chunk.retrieved_context.as_ref();
            Citation {
                start_index: None,
                end_index: None,
                uri: ctx.and_then(|c| c.uri.clone()),
                title: ctx.and_then(|c| c.title.clone()),
                snippet: ctx.and_then(|c| c.text.clone()),
            }
        })
        .collect();

    for support in metadata.grounding_supports.iter().flatten() {
        let Some(segment) = &support.segment else {
            continue;
        };
        for &index in &support.grounding_chunk_indices {
            let Some(citation) = usize::try_from(index)
                .ok()
                .and_then(|i| citations.get_mut(i))
            else {
                continue;
            };
            citation.start_index = Some(segment.start_index.unwrap_or(0));
            citation.end_index = segment.end_index;
        }
    }

    citations
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(value: serde_json::Value) -> GroundingMetadata {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_two_chunks_one_support() {
        let meta = metadata(json!({
            "groundingChunks": [
                {"retrievedContext": {"uri": "u1", "title": "t1", "text": "x1"}},
                {"retrievedContext": {"uri": "u2", "title": "t2", "text": "x2"}}
            ],
            "groundingSupports": [
                {"segment": {"startIndex": 0, "endIndex": 10}, "groundingChunkIndices": [1]}
            ]
        }));

        let citations = reconstruct_citations(Some(&meta));

        assert_eq!(citations.len(), 2);
        assert_eq!(
            citations[0],
            Citation {
                start_index: None,
                end_index: None,
                uri: Some("u1".into()),
                title: Some("t1".into()),
                snippet: Some("x1".into()),
            }
        );
        assert_eq!(
            citations[1],
            Citation {
                start_index: Some(0),
                end_index: Some(10),
                uri: Some("u2".into()),
                title: Some("t2".into()),
                snippet: Some("x2".into()),
            }
        );
    }

    #[test]
    fn test_out_of_range_index_is_ignored() {
        let meta = metadata(json!({
            "groundingChunks": [
                {"retrievedContext": {"uri": "ua", "title": "A", "text": "a"}},
                {"retrievedContext": {"uri": "ub", "title": "B", "text": "b"}},
                {"retrievedContext": {"uri": "uc", "title": "C", "text": "c"}}
            ],
            "groundingSupports": [
                {"segment": {"startIndex": 0, "endIndex": 10}, "groundingChunkIndices": [0]},
                {"segment": {"startIndex": 3, "endIndex": 8}, "groundingChunkIndices": [5, -1]}
            ]
        }));

        let citations = reconstruct_citations(Some(&meta));

        assert_eq!(citations.len(), 3);
        assert_eq!(citations[0].start_index, Some(0));
        assert_eq!(citations[0].end_index, Some(10));
        assert_eq!(citations[0].title.as_deref(), Some("A"));
        for (citation, title) in citations[1..].iter().zip(["B", "C"]) {
            assert_eq!(citation.start_index, None);
            assert_eq!(citation.end_index, None);
            assert_eq!(citation.title.as_deref(), Some(title));
        }
    }

    #[test]
    fn test_missing_start_index_defaults_to_zero() {
        let meta = metadata(json!({
            "groundingChunks": [{"retrievedContext": {"title": "doc"}}],
            "groundingSupports": [
                {"segment": {"endIndex": 42}, "groundingChunkIndices": [0]}
            ]
        }));

        let citations = reconstruct_citations(Some(&meta));
        assert_eq!(citations[0].start_index, Some(0));
        assert_eq!(citations[0].end_index, Some(42));
    }

    #[test]
    fn test_last_support_wins() {
        let meta = metadata(json!({
            "groundingChunks": [{"retrievedContext": {"uri": "u"}}],
            "groundingSupports": [
                {"segment": {"startIndex": 0, "endIndex": 5}, "groundingChunkIndices": [0]},
                {"segment": {"startIndex": 20, "endIndex": 30}, "groundingChunkIndices": [0]}
            ]
        }));

        let citations = reconstruct_citations(Some(&meta));
        assert_eq!(citations[0].start_index, Some(20));
        assert_eq!(citations[0].end_index, Some(30));
    }

    #[test]
    fn test_support_without_segment_is_skipped() {
        let meta = metadata(json!({
            "groundingChunks": [{"retrievedContext": {"uri": "u"}}],
            "groundingSupports": [{"groundingChunkIndices": [0]}]
        }));

        let citations = reconstruct_citations(Some(&meta));
        assert_eq!(citations[0].start_index, None);
    }

    #[test]
    fn test_no_metadata_yields_nothing() {
        assert!(reconstruct_citations(None).is_empty());
        assert!(reconstruct_citations(Some(&GroundingMetadata::default())).is_empty());
    }

    #[test]
    fn test_chunk_without_context_still_counts() {
        let meta = metadata(json!({
            "groundingChunks": [{}, {"retrievedContext": {"uri": "u2"}}]
        }));

        let citations = reconstruct_citations(Some(&meta));
        assert_eq!(citations.len(), 2);
        assert_eq!(citations[0], Citation::default());
        assert_eq!(citations[1].uri.as_deref(), Some("u2"));
    }
}
