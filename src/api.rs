//! HTTP surface for the document query service.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /upload-document/` – Multipart upload (`file` + `domain`). Extracts text,
//!   chunks and embeds it, and indexes the vectors before returning.
//! - `POST /query/` – Answer a natural-language query against the indexed documents,
//!   optionally restricted by domain or document ids.
//! - `GET /document/:id` – Catalog record for an uploaded document.
//! - `DELETE /document/:id` – Remove a document and its vectors.
//! - `GET /health` – Liveness probe.
//! - `GET /metrics` – Ingestion and query counters.
//! - `POST /example-query/` – Run a canned insurance query through the normal path.
//!
//! Handlers stay thin: validation happens here, everything else is delegated to
//! the [`QueryApi`] service behind the router.

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    DeleteError, DocumentKind, DocumentMetadata, DocumentUpload, Domain, IngestError, QueryApi,
    QueryError, QueryRequest, QueryResponse,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Largest accepted upload body. Uploads are processed in memory, so the cap
/// keeps a single request from pinning the process.
const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

const EXAMPLE_QUERY: &str = "Does this policy cover knee surgery, and what are the conditions?";

/// Build the HTTP router exposing the document query API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: QueryApi + 'static,
{
    Router::new()
        .route("/upload-document/", post(upload_document::<S>))
        .route("/query/", post(run_query::<S>))
        .route("/example-query/", post(example_query::<S>))
        .route(
            "/document/:id",
            get(document_status::<S>).delete(delete_document::<S>),
        )
        .route("/health", get(health))
        .route("/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Success response for the `POST /upload-document/` endpoint.
#[derive(Serialize)]
struct UploadResponse {
    /// Human-readable confirmation.
    message: String,
    /// Identifier assigned to the stored document.
    document_id: String,
    /// Filename as received in the multipart payload.
    filename: String,
    /// Domain the document was filed under.
    domain: Domain,
}

/// Accept a document upload and run it through the ingestion pipeline.
///
/// The multipart payload must carry a `file` part (with filename) and a
/// `domain` part. The document format is resolved from the filename
/// extension; unsupported extensions and unknown domains are rejected before
/// any processing starts.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    S: QueryApi,
{
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut domain_raw: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::BadRequest(format!("Invalid multipart payload: {err}")))?
    {
        let name = field.name().map(|name| name.to_string());
        match name.as_deref() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .map(|name| name.to_string())
                    .ok_or_else(|| {
                        AppError::BadRequest("File field is missing a filename".into())
                    })?;
                let bytes = field.bytes().await.map_err(|err| {
                    AppError::BadRequest(format!("Failed to read file field: {err}"))
                })?;
                file = Some((filename, bytes.to_vec()));
            }
            Some("domain") => {
                let value = field.text().await.map_err(|err| {
                    AppError::BadRequest(format!("Failed to read domain field: {err}"))
                })?;
                domain_raw = Some(value);
            }
            _ => {}
        }
    }

    let (filename, bytes) =
        file.ok_or_else(|| AppError::BadRequest("Missing file field".into()))?;
    let domain_raw =
        domain_raw.ok_or_else(|| AppError::BadRequest("Missing domain field".into()))?;
    let domain: Domain = domain_raw
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Unknown domain: {domain_raw}")))?;
    let kind = DocumentKind::from_filename(&filename)
        .ok_or_else(|| AppError::BadRequest(format!("Unsupported file format: {filename}")))?;

    let receipt = service
        .ingest_document(DocumentUpload {
            filename: filename.clone(),
            kind,
            domain,
            bytes,
        })
        .await?;
    tracing::info!(
        document_id = %receipt.document_id,
        chunks = receipt.chunk_count,
        skipped_duplicates = receipt.skipped_duplicates,
        "Upload request completed"
    );

    Ok(Json(UploadResponse {
        message: "Document uploaded and processed successfully".into(),
        document_id: receipt.document_id,
        filename,
        domain,
    }))
}

/// Answer a query against the indexed documents.
async fn run_query<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError>
where
    S: QueryApi,
{
    if request.query.trim().is_empty() {
        return Err(AppError::BadRequest("Query text must not be empty".into()));
    }
    let response = service.answer_query(request).await?;
    Ok(Json(response))
}

/// Run the canned insurance sample query through the normal query path.
async fn example_query<S>(State(service): State<Arc<S>>) -> Result<Json<QueryResponse>, AppError>
where
    S: QueryApi,
{
    let request = QueryRequest {
        query: EXAMPLE_QUERY.to_string(),
        domain: Some(Domain::Insurance),
        document_ids: None,
        max_results: None,
        include_explanation: None,
    };
    let response = service.answer_query(request).await?;
    Ok(Json(response))
}

/// Return the catalog record for a document.
async fn document_status<S>(
    State(service): State<Arc<S>>,
    Path(document_id): Path<String>,
) -> Result<Json<DocumentMetadata>, AppError>
where
    S: QueryApi,
{
    match service.document_info(&document_id)? {
        Some(metadata) => Ok(Json(metadata)),
        None => Err(AppError::NotFound("Document not found".into())),
    }
}

/// Success response for the `DELETE /document/:id` endpoint.
#[derive(Serialize)]
struct DeleteResponse {
    message: String,
    document_id: String,
}

/// Delete a document and its vectors.
async fn delete_document<S>(
    State(service): State<Arc<S>>,
    Path(document_id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError>
where
    S: QueryApi,
{
    let deleted = service.delete_document(&document_id).await?;
    if !deleted {
        return Err(AppError::NotFound("Document not found".into()));
    }
    Ok(Json(DeleteResponse {
        message: "Document deleted successfully".into(),
        document_id,
    }))
}

/// Response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// Liveness probe.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "docquery",
    })
}

/// Return ingestion and query counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: QueryApi,
{
    Json(service.metrics_snapshot())
}

enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<IngestError> for AppError {
    fn from(inner: IngestError) -> Self {
        Self::Internal(inner.to_string())
    }
}

impl From<QueryError> for AppError {
    fn from(inner: QueryError) -> Self {
        Self::Internal(inner.to_string())
    }
}

impl From<DeleteError> for AppError {
    fn from(inner: DeleteError) -> Self {
        Self::Internal(inner.to_string())
    }
}

impl From<crate::catalog::CatalogError> for AppError {
    fn from(inner: crate::catalog::CatalogError) -> Self {
        Self::Internal(inner.to_string())
    }
}
