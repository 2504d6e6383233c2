//! Document service coordinating extraction, chunking, embedding, retrieval,
//! and analysis.

use crate::{
    catalog::{Catalog, CatalogError},
    config::get_config,
    extract::extract,
    gemini::{
        GeminiClient,
        prompt::{build_analysis_prompt, parse_analysis},
    },
    metrics::{MetricsSnapshot, PipelineMetrics},
    pinecone::{PineconeService, VectorRecord, build_metadata_filter},
    processing::{
        chunking::chunk_text,
        mappers::{dedupe_chunks, map_match},
        types::{
            DecisionRationale, DeleteError, DocumentMetadata, DocumentUpload, IngestError,
            IngestReceipt, QueryError, QueryRequest, QueryResponse, RetrievalResult,
            current_timestamp_rfc3339,
        },
    },
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

/// Character budget for chunk text stored in vector metadata.
const STORED_CONTENT_CHARS: usize = 1000;

const NO_ANALYSIS_ANSWER: &str = "Query processed. Retrieved relevant document chunks.";
const NO_ANALYSIS_REASONING: &str = "Basic retrieval without LLM analysis";

/// Coordinates the full document pipeline: extraction, chunking, embedding,
/// vector storage, and LLM analysis.
///
/// The service owns long-lived handles to the Gemini client, the Pinecone
/// transport, and the catalog so the HTTP surface reuses the same components
/// for every request. Construct it once near process start and share it
/// through an `Arc`.
pub struct DocumentService {
    gemini: GeminiClient,
    pinecone: PineconeService,
    catalog: Catalog,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the document pipeline used by the HTTP surface.
#[async_trait]
pub trait QueryApi: Send + Sync {
    /// Extract, chunk, embed, and index an uploaded document.
    async fn ingest_document(&self, upload: DocumentUpload) -> Result<IngestReceipt, IngestError>;

    /// Retrieve relevant chunks for a query and analyze them.
    async fn answer_query(&self, request: QueryRequest) -> Result<QueryResponse, QueryError>;

    /// Look up the catalog record for a document.
    fn document_info(&self, document_id: &str) -> Result<Option<DocumentMetadata>, CatalogError>;

    /// Remove a document and its vectors. Returns whether it existed.
    async fn delete_document(&self, document_id: &str) -> Result<bool, DeleteError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DocumentService {
    /// Build a new document service, initializing backing services as needed.
    pub async fn new() -> Self {
        let config = get_config();
        tracing::info!("Initializing Gemini client");
        let gemini = GeminiClient::new().expect("Failed to initialize Gemini client");
        tracing::info!("Connecting to Pinecone");
        let pinecone = PineconeService::connect()
            .await
            .expect("Failed to connect to Pinecone");
        let catalog =
            Catalog::open(Path::new(&config.catalog_path)).expect("Failed to open catalog");
        tracing::debug!(
            index = %config.pinecone_index_name,
            catalog = %config.catalog_path,
            "Document service ready"
        );

        Self {
            gemini,
            pinecone,
            catalog,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Extract, chunk, embed, and index an uploaded document.
    ///
    /// The catalog row is written before indexing starts so a failed run
    /// leaves a visible trace; on error both the row and any vectors already
    /// written are rolled back best-effort.
    pub async fn ingest_document(
        &self,
        upload: DocumentUpload,
    ) -> Result<IngestReceipt, IngestError> {
        let document_id = Uuid::new_v4().to_string();
        tracing::info!(
            document_id = %document_id,
            filename = %upload.filename,
            kind = upload.kind.as_str(),
            domain = %upload.domain,
            size_bytes = upload.bytes.len(),
            "Processing uploaded document"
        );

        let extracted = extract(upload.kind, &upload.bytes)?;
        let row = DocumentMetadata {
            document_id: document_id.clone(),
            filename: upload.filename.clone(),
            document_type: upload.kind,
            domain: upload.domain,
            upload_timestamp: current_timestamp_rfc3339(),
            file_size: upload.bytes.len() as u64,
            page_count: extracted.page_count,
            chunk_count: 0,
            processed: false,
        };
        self.catalog.insert_document(&row)?;

        match self
            .index_document(&document_id, &upload, &extracted.text)
            .await
        {
            Ok(receipt) => Ok(receipt),
            Err(error) => {
                tracing::error!(
                    document_id = %document_id,
                    error = %error,
                    "Ingestion failed, rolling back"
                );
                self.cleanup_failed_ingest(&document_id).await;
                Err(error)
            }
        }
    }

    /// Retrieve relevant chunks for a query and analyze them with the LLM.
    pub async fn answer_query(&self, request: QueryRequest) -> Result<QueryResponse, QueryError> {
        let started = Instant::now();
        let config = get_config();
        let QueryRequest {
            query,
            domain,
            document_ids,
            max_results,
            include_explanation,
        } = request;

        let vector = self
            .gemini
            .embed_query(&query)
            .await
            .map_err(QueryError::Embedding)?;
        let expected = config.embedding_dimension;
        let actual = vector.len();
        if actual != expected {
            return Err(QueryError::DimensionMismatch { expected, actual });
        }

        let limit = max_results
            .unwrap_or(config.query_default_limit)
            .clamp(1, config.query_max_limit);
        let filter = build_metadata_filter(domain, document_ids.as_deref());
        let hits = self.pinecone.query(vector, limit, filter).await?;
        let retrieved: Vec<RetrievalResult> = hits.into_iter().map(map_match).collect();

        let include_explanation = include_explanation.unwrap_or(true);
        let (answer, rationale) = if include_explanation && !retrieved.is_empty() {
            let prompt = build_analysis_prompt(&query, &retrieved, domain);
            let raw = self
                .gemini
                .generate(&prompt)
                .await
                .map_err(QueryError::Generation)?;
            let analysis = parse_analysis(&raw);
            (analysis.answer, analysis.rationale)
        } else {
            (
                NO_ANALYSIS_ANSWER.to_string(),
                DecisionRationale {
                    reasoning: NO_ANALYSIS_REASONING.to_string(),
                    confidence_score: 0.0,
                    supporting_evidence: Vec::new(),
                    conditions: Vec::new(),
                    limitations: Vec::new(),
                },
            )
        };

        let processing_time = started.elapsed().as_secs_f64();
        if let Err(error) = self.catalog.log_query(
            &query,
            domain.map(|domain| domain.as_str()),
            retrieved.len(),
            processing_time,
        ) {
            tracing::warn!(error = %error, "Failed to log query");
        }
        self.metrics.record_query();
        tracing::info!(
            results = retrieved.len(),
            elapsed_seconds = processing_time,
            analyzed = include_explanation && !retrieved.is_empty(),
            "Query answered"
        );

        Ok(QueryResponse {
            query,
            answer,
            decision_rationale: rationale,
            retrieved_chunks: retrieved,
            processing_time,
            timestamp: current_timestamp_rfc3339(),
        })
    }

    /// Look up the catalog record for a document.
    pub fn document_info(
        &self,
        document_id: &str,
    ) -> Result<Option<DocumentMetadata>, CatalogError> {
        self.catalog.get_document(document_id)
    }

    /// Remove a document's vectors and catalog row. Returns whether it existed.
    ///
    /// Vectors are removed before the catalog row so a partial failure leaves
    /// the document visible and the deletion retryable.
    pub async fn delete_document(&self, document_id: &str) -> Result<bool, DeleteError> {
        if self.catalog.get_document(document_id)?.is_none() {
            return Ok(false);
        }

        let removed = self.pinecone.delete_document(document_id).await?;
        self.catalog.delete_document(document_id)?;
        tracing::info!(document_id, vectors_removed = removed, "Document deleted");
        Ok(true)
    }

    /// Return the current ingestion and query metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn index_document(
        &self,
        document_id: &str,
        upload: &DocumentUpload,
        text: &str,
    ) -> Result<IngestReceipt, IngestError> {
        let config = get_config();
        let chunks = chunk_text(text, config.chunk_size, config.chunk_overlap)?;
        let (chunks, skipped_duplicates) = dedupe_chunks(chunks);

        if chunks.is_empty() {
            tracing::warn!(document_id, "Document produced no indexable text");
            self.catalog.mark_processed(document_id, 0)?;
            self.metrics.record_ingest(0);
            return Ok(IngestReceipt {
                document_id: document_id.to_string(),
                chunk_count: 0,
                skipped_duplicates,
            });
        }

        let embeddings = self.gemini.embed_documents(&chunks).await?;
        debug_assert_eq!(chunks.len(), embeddings.len());

        let records: Vec<VectorRecord> = chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (chunk, vector))| VectorRecord {
                id: format!("{document_id}:{index}"),
                values: vector,
                metadata: chunk_metadata(document_id, upload, index, chunk),
            })
            .collect();

        let chunk_count = chunks.len();
        let upserted = self.pinecone.upsert_vectors(records).await?;
        self.catalog.mark_processed(document_id, chunk_count)?;
        self.metrics.record_ingest(chunk_count as u64);
        tracing::info!(
            document_id,
            chunks = chunk_count,
            upserted,
            skipped_duplicates,
            "Document indexed"
        );

        Ok(IngestReceipt {
            document_id: document_id.to_string(),
            chunk_count,
            skipped_duplicates,
        })
    }

    async fn cleanup_failed_ingest(&self, document_id: &str) {
        if let Err(error) = self.catalog.delete_document(document_id) {
            tracing::warn!(
                document_id,
                error = %error,
                "Failed to remove catalog row after ingest error"
            );
        }
        if let Err(error) = self.pinecone.delete_document(document_id).await {
            tracing::warn!(
                document_id,
                error = %error,
                "Failed to remove vectors after ingest error"
            );
        }
    }
}

/// Metadata stored alongside each vector. Carries everything the metadata
/// filter and the prompt builder read back at query time.
fn chunk_metadata(
    document_id: &str,
    upload: &DocumentUpload,
    index: usize,
    chunk: &str,
) -> Map<String, Value> {
    let mut metadata = Map::new();
    metadata.insert("document_id".into(), Value::String(document_id.to_string()));
    metadata.insert(
        "domain".into(),
        Value::String(upload.domain.as_str().to_string()),
    );
    metadata.insert("filename".into(), Value::String(upload.filename.clone()));
    metadata.insert("chunk_index".into(), Value::from(index));
    metadata.insert(
        "content".into(),
        Value::String(chunk.chars().take(STORED_CONTENT_CHARS).collect()),
    );
    metadata
}

#[async_trait]
impl QueryApi for DocumentService {
    async fn ingest_document(&self, upload: DocumentUpload) -> Result<IngestReceipt, IngestError> {
        DocumentService::ingest_document(self, upload).await
    }

    async fn answer_query(&self, request: QueryRequest) -> Result<QueryResponse, QueryError> {
        DocumentService::answer_query(self, request).await
    }

    fn document_info(&self, document_id: &str) -> Result<Option<DocumentMetadata>, CatalogError> {
        DocumentService::document_info(self, document_id)
    }

    async fn delete_document(&self, document_id: &str) -> Result<bool, DeleteError> {
        DocumentService::delete_document(self, document_id).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        DocumentService::metrics_snapshot(self)
    }
}
