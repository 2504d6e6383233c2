//! Mapping helpers for chunk preparation and retrieval results.

use std::collections::HashSet;

use serde_json::Value;

use super::chunking::compute_chunk_hash;
use super::types::RetrievalResult;
use crate::pinecone::VectorMatch;

/// Remove duplicate chunks within a document, keeping the first occurrence.
///
/// Returns the surviving chunks and the number of duplicates skipped.
pub(crate) fn dedupe_chunks(chunks: Vec<String>) -> (Vec<String>, usize) {
    let mut seen = HashSet::new();
    let mut deduped = Vec::new();
    let mut skipped = 0;

    for text in chunks {
        if text.trim().is_empty() {
            continue;
        }
        if seen.insert(compute_chunk_hash(&text)) {
            deduped.push(text);
        } else {
            skipped += 1;
        }
    }

    (deduped, skipped)
}

/// Map a vector store match into the retrieval result returned to clients.
///
/// `document_id` and `content` are promoted out of the metadata map; the
/// remaining fields (domain, filename, chunk index) stay in `metadata`.
pub(crate) fn map_match(hit: VectorMatch) -> RetrievalResult {
    let VectorMatch {
        id,
        score,
        metadata,
    } = hit;

    let mut metadata = metadata.unwrap_or_default();
    let document_id = match metadata.remove("document_id") {
        Some(Value::String(value)) => value,
        _ => String::new(),
    };
    let content = match metadata.remove("content") {
        Some(Value::String(value)) => value,
        _ => String::new(),
    };

    RetrievalResult {
        chunk_id: id,
        document_id,
        content,
        relevance_score: score,
        metadata,
    }
}
