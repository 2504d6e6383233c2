//! Core data types and error definitions for the document pipeline.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::extract::ExtractError;
use crate::gemini::GeminiError;
use crate::pinecone::PineconeError;

/// Business domain a document or query belongs to.
///
/// The domain scopes retrieval through the vector metadata filter and selects
/// the guidance block used when generating an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Insurance policies and claims.
    Insurance,
    /// Contracts and legal documents.
    Legal,
    /// HR policies and employment documents.
    Hr,
    /// Regulatory and compliance material.
    Compliance,
}

impl Domain {
    /// Canonical lowercase name used in vector metadata and the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insurance => "insurance",
            Self::Legal => "legal",
            Self::Hr => "hr",
            Self::Compliance => "compliance",
        }
    }
}

impl std::str::FromStr for Domain {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "insurance" => Ok(Self::Insurance),
            "legal" => Ok(Self::Legal),
            "hr" => Ok(Self::Hr),
            "compliance" => Ok(Self::Compliance),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supported upload formats, resolved from the filename extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// PDF documents (`.pdf`).
    Pdf,
    /// Word documents (`.docx`).
    Docx,
    /// Email messages (`.eml`, `.msg`).
    Email,
}

impl DocumentKind {
    /// Resolve the kind from a filename, or `None` for unsupported extensions.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "docx" => Some(Self::Docx),
            "eml" | "msg" => Some(Self::Email),
            _ => None,
        }
    }

    /// Canonical lowercase name stored in the catalog.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Email => "email",
        }
    }
}

impl std::str::FromStr for DocumentKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            "email" => Ok(Self::Email),
            _ => Err(()),
        }
    }
}

/// Current timestamp formatted for catalog rows and responses.
pub(crate) fn current_timestamp_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Catalog record describing one ingested document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    /// Identifier assigned at upload time.
    pub document_id: String,
    /// Original filename of the upload.
    pub filename: String,
    /// Detected document format.
    pub document_type: DocumentKind,
    /// Business domain supplied with the upload.
    pub domain: Domain,
    /// RFC3339 timestamp recorded when the upload was received.
    pub upload_timestamp: String,
    /// Size of the uploaded file in bytes.
    pub file_size: u64,
    /// Page count for paged formats.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_count: Option<u32>,
    /// Number of chunks indexed for the document.
    pub chunk_count: usize,
    /// Whether ingestion completed and the vectors are queryable.
    pub processed: bool,
}

/// Raw upload handed to the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct DocumentUpload {
    /// Original filename of the upload.
    pub filename: String,
    /// Format resolved from the filename extension.
    pub kind: DocumentKind,
    /// Business domain the document belongs to.
    pub domain: Domain,
    /// File content.
    pub bytes: Vec<u8>,
}

/// Summary of a completed ingestion.
#[derive(Debug, Clone)]
pub struct IngestReceipt {
    /// Identifier assigned to the document.
    pub document_id: String,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Chunks dropped within the document due to duplicate content.
    pub skipped_duplicates: usize,
}

/// Parameters accepted by the query endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Natural language question to answer.
    pub query: String,
    /// Optional domain restriction for retrieval and analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<Domain>,
    /// Optional restriction to specific document identifiers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_ids: Option<Vec<String>>,
    /// Maximum number of chunks to retrieve (defaults applied downstream).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
    /// Whether to run the generated analysis step (defaults to true).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_explanation: Option<bool>,
}

/// One retrieved chunk returned to API consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Vector identifier of the chunk.
    pub chunk_id: String,
    /// Identifier of the document the chunk belongs to.
    pub document_id: String,
    /// Chunk text stored in the vector metadata.
    pub content: String,
    /// Similarity score reported by the vector store.
    pub relevance_score: f32,
    /// Remaining metadata fields stored with the vector.
    pub metadata: Map<String, Value>,
}

/// Structured justification attached to a generated answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRationale {
    /// Step-by-step reasoning behind the answer.
    pub reasoning: String,
    /// Confidence in the answer, clamped into `0.0..=1.0`.
    pub confidence_score: f32,
    /// Direct quotes from the retrieved context supporting the answer.
    pub supporting_evidence: Vec<String>,
    /// Conditions or requirements that apply to the answer.
    pub conditions: Vec<String>,
    /// Limitations or uncertainty in the analysis.
    pub limitations: Vec<String>,
}

/// Full response payload for an answered query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Original query text.
    pub query: String,
    /// Generated (or canned) answer.
    pub answer: String,
    /// Justification for the answer.
    pub decision_rationale: DecisionRationale,
    /// Chunks retrieved as context, in relevance order.
    pub retrieved_chunks: Vec<RetrievalResult>,
    /// Wall-clock processing time in seconds.
    pub processing_time: f64,
    /// RFC3339 timestamp of the response.
    pub timestamp: String,
}

/// Errors produced while turning raw text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible character budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Errors emitted by the document ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Text extraction failed for the uploaded bytes.
    #[error("Failed to extract document text: {0}")]
    Extract(#[from] ExtractError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Gemini failed to produce embeddings for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] GeminiError),
    /// Pinecone interaction failed while writing or deleting vectors.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] PineconeError),
    /// Catalog read or write failed.
    #[error("Catalog operation failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// Errors emitted while answering a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// Gemini failed to embed the query text.
    #[error("Failed to embed query: {0}")]
    Embedding(#[source] GeminiError),
    /// Returned embedding dimension does not match configuration.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension configured for the index.
        expected: usize,
        /// Dimension of the embedding Gemini returned.
        actual: usize,
    },
    /// Pinecone similarity search failed.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] PineconeError),
    /// Gemini failed to generate the analysis.
    #[error("Failed to generate analysis: {0}")]
    Generation(#[source] GeminiError),
}

/// Errors emitted while deleting a document.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Pinecone rejected the vector listing or deletion.
    #[error("Vector store request failed: {0}")]
    VectorStore(#[from] PineconeError),
    /// Catalog read or delete failed.
    #[error("Catalog operation failed: {0}")]
    Catalog(#[from] CatalogError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_document_kind_from_extension() {
        assert_eq!(
            DocumentKind::from_filename("policy.PDF"),
            Some(DocumentKind::Pdf)
        );
        assert_eq!(
            DocumentKind::from_filename("contract.docx"),
            Some(DocumentKind::Docx)
        );
        assert_eq!(
            DocumentKind::from_filename("claim.eml"),
            Some(DocumentKind::Email)
        );
        assert_eq!(
            DocumentKind::from_filename("thread.msg"),
            Some(DocumentKind::Email)
        );
        assert_eq!(DocumentKind::from_filename("notes.txt"), None);
        assert_eq!(DocumentKind::from_filename("no-extension"), None);
    }

    #[test]
    fn parses_domains_case_insensitively() {
        assert_eq!("Insurance".parse(), Ok(Domain::Insurance));
        assert_eq!(" legal ".parse(), Ok(Domain::Legal));
        assert_eq!("HR".parse(), Ok(Domain::Hr));
        assert!("finance".parse::<Domain>().is_err());
    }

    #[test]
    fn query_request_optionals_default_to_none() {
        let request: QueryRequest =
            serde_json::from_str(r#"{"query": "Does the policy cover surgery?"}"#).unwrap();
        assert_eq!(request.query, "Does the policy cover surgery?");
        assert!(request.domain.is_none());
        assert!(request.document_ids.is_none());
        assert!(request.max_results.is_none());
        assert!(request.include_explanation.is_none());
    }

    #[test]
    fn domain_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Domain::Hr).unwrap(), "\"hr\"");
        assert_eq!(
            serde_json::to_string(&DocumentKind::Email).unwrap(),
            "\"email\""
        );
    }
}
