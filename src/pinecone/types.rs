//! Shared types used by the Pinecone client and helpers.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors returned while interacting with Pinecone.
#[derive(Debug, Error)]
pub enum PineconeError {
    /// Host or URL failed to parse or normalize.
    #[error("Invalid Pinecone host: {0}")]
    InvalidHost(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Pinecone responded with an unexpected status code.
    #[error("Unexpected Pinecone response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Pinecone.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Index creation finished but the index never became ready.
    #[error("Pinecone index '{0}' did not become ready")]
    NotReady(String),
}

/// Vector prepared for upsert, including its metadata payload.
#[derive(Debug, Clone, Serialize)]
pub struct VectorRecord {
    /// Vector identifier (`{document_id}:{chunk_index}`).
    pub id: String,
    /// Embedding values.
    pub values: Vec<f32>,
    /// Metadata stored alongside the vector.
    pub metadata: Map<String, Value>,
}

/// Scored match returned by similarity queries.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// Identifier assigned to the vector.
    pub id: String,
    /// Similarity score computed by Pinecone.
    pub score: f32,
    /// Metadata stored with the vector, when requested.
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct DescribeIndexResponse {
    #[serde(default)]
    pub(crate) host: Option<String>,
    #[serde(default)]
    pub(crate) status: Option<IndexStatus>,
}

#[derive(Deserialize)]
pub(crate) struct IndexStatus {
    #[serde(default)]
    pub(crate) ready: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpsertResponse {
    #[serde(default)]
    pub(crate) upserted_count: usize,
}

#[derive(Deserialize)]
pub(crate) struct QueryResponseBody {
    #[serde(default)]
    pub(crate) matches: Vec<WireMatch>,
}

#[derive(Deserialize)]
pub(crate) struct WireMatch {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) score: f32,
    #[serde(default)]
    pub(crate) metadata: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
pub(crate) struct ListResponse {
    #[serde(default)]
    pub(crate) vectors: Vec<ListedVector>,
    #[serde(default)]
    pub(crate) pagination: Option<Pagination>,
}

#[derive(Deserialize)]
pub(crate) struct ListedVector {
    pub(crate) id: String,
}

#[derive(Deserialize)]
pub(crate) struct Pagination {
    #[serde(default)]
    pub(crate) next: Option<String>,
}
