//! Document processing pipeline: extraction, chunking, embedding, and
//! retrieval orchestration.

pub mod chunking;
mod mappers;
mod service;
pub mod types;

pub use service::{DocumentService, QueryApi};
pub use types::{
    ChunkingError, DecisionRationale, DeleteError, DocumentKind, DocumentMetadata, DocumentUpload,
    Domain, IngestError, IngestReceipt, QueryError, QueryRequest, QueryResponse, RetrievalResult,
};
