//! HTTP client wrapper for Pinecone control plane and data plane operations.

use reqwest::{Client, Method, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;

use futures_util::{StreamExt, pin_mut};

use super::types::{
    DescribeIndexResponse, ListResponse, PineconeError, QueryResponseBody, UpsertResponse,
    VectorMatch, VectorRecord,
};
use crate::config::get_config;

const CONTROL_PLANE_URL: &str = "https://api.pinecone.io";
const API_VERSION: &str = "2025-01";
const UPSERT_BATCH_SIZE: usize = 100;
const READY_POLL_ATTEMPTS: u32 = 30;
const READY_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Lightweight HTTP client for the configured Pinecone index.
///
/// Construction resolves the data-plane host once: either from
/// `PINECONE_HOST` or by describing (and if necessary creating) the index
/// through the control plane. All subsequent operations go straight to the
/// data plane.
pub struct PineconeService {
    pub(crate) client: Client,
    pub(crate) host: String,
    pub(crate) api_key: String,
}

/// Parameters used to create the index when it does not exist yet.
pub(crate) struct IndexSpec<'a> {
    pub(crate) name: &'a str,
    pub(crate) dimension: usize,
    pub(crate) cloud: &'a str,
    pub(crate) region: &'a str,
}

impl PineconeService {
    /// Connect to the configured index, creating it when absent.
    pub async fn connect() -> Result<Self, PineconeError> {
        let config = get_config();
        let client = Client::builder().user_agent("docquery/0.2").build()?;

        let host = match &config.pinecone_host {
            Some(host) => normalize_host(host)?,
            None => {
                let spec = IndexSpec {
                    name: &config.pinecone_index_name,
                    dimension: config.embedding_dimension,
                    cloud: &config.pinecone_cloud,
                    region: &config.pinecone_region,
                };
                resolve_index_host(&client, CONTROL_PLANE_URL, &config.pinecone_api_key, &spec)
                    .await?
            }
        };
        tracing::debug!(
            host = %host,
            index = %config.pinecone_index_name,
            "Pinecone data plane ready"
        );

        Ok(Self {
            client,
            host,
            api_key: config.pinecone_api_key.clone(),
        })
    }

    /// Upsert vectors into the index, batching requests as needed.
    ///
    /// Returns the total number of vectors the index acknowledged.
    pub async fn upsert_vectors(&self, vectors: Vec<VectorRecord>) -> Result<usize, PineconeError> {
        if vectors.is_empty() {
            return Ok(0);
        }

        let mut upserted = 0usize;
        for batch in vectors.chunks(UPSERT_BATCH_SIZE) {
            let response = self
                .request(Method::POST, "vectors/upsert")
                .json(&json!({ "vectors": batch }))
                .send()
                .await?;
            let payload: UpsertResponse = self.read_json(response, "upsert").await?;
            upserted += payload.upserted_count;
            tracing::debug!(count = batch.len(), "Upserted vector batch");
        }

        Ok(upserted)
    }

    /// Perform a similarity query, returning scored matches with metadata.
    pub async fn query(
        &self,
        vector: Vec<f32>,
        top_k: usize,
        filter: Option<Value>,
    ) -> Result<Vec<VectorMatch>, PineconeError> {
        let mut body = serde_json::Map::new();
        body.insert("vector".into(), json!(vector));
        body.insert("topK".into(), json!(top_k));
        body.insert("includeMetadata".into(), Value::Bool(true));
        if let Some(filter_value) = filter {
            body.insert("filter".into(), filter_value);
        }

        let response = self
            .request(Method::POST, "query")
            .json(&body)
            .send()
            .await?;
        let payload: QueryResponseBody = self.read_json(response, "query").await?;

        let matches = payload
            .matches
            .into_iter()
            .map(|hit| VectorMatch {
                id: hit.id,
                score: hit.score,
                metadata: hit.metadata,
            })
            .collect();
        Ok(matches)
    }

    /// Fetch one page of vector ids matching an id prefix.
    pub(crate) async fn list_id_page(
        &self,
        prefix: &str,
        pagination_token: Option<&str>,
        limit: usize,
    ) -> Result<ListResponse, PineconeError> {
        let limit = limit.to_string();
        let mut request = self
            .request(Method::GET, "vectors/list")
            .query(&[("prefix", prefix), ("limit", &limit)]);
        if let Some(token) = pagination_token {
            request = request.query(&[("paginationToken", token)]);
        }

        let response = request.send().await?;
        self.read_json(response, "list").await
    }

    /// Delete vectors by explicit id list.
    pub async fn delete_by_ids(&self, ids: &[String]) -> Result<(), PineconeError> {
        if ids.is_empty() {
            return Ok(());
        }

        let response = self
            .request(Method::POST, "vectors/delete")
            .json(&json!({ "ids": ids }))
            .send()
            .await?;
        self.ensure_success(response, || {
            tracing::debug!(count = ids.len(), "Deleted vector batch");
        })
        .await
    }

    /// Delete every vector belonging to a document.
    ///
    /// Vector ids carry the document id as a prefix, so deletion lists the
    /// prefix page by page and removes each page of ids. Returns the number
    /// of vectors removed.
    pub async fn delete_document(&self, document_id: &str) -> Result<usize, PineconeError> {
        let prefix = format!("{document_id}:");
        let pages = super::pager::stream_id_pages(self, &prefix);
        pin_mut!(pages);

        let mut removed = 0usize;
        while let Some(page) = pages.next().await {
            let ids = page?;
            self.delete_by_ids(&ids).await?;
            removed += ids.len();
        }

        tracing::info!(document_id, removed, "Deleted document vectors");
        Ok(removed)
    }

    pub(crate) fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.host, path);
        self.client
            .request(method, url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-Api-Version", API_VERSION)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, PineconeError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(operation, error = %error, "Pinecone request failed");
            return Err(error);
        }
        Ok(response.json().await?)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), PineconeError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Pinecone request failed");
            Err(error)
        }
    }
}

/// Resolve the data-plane host for the index, creating the index if needed.
pub(crate) async fn resolve_index_host(
    client: &Client,
    control_base: &str,
    api_key: &str,
    spec: &IndexSpec<'_>,
) -> Result<String, PineconeError> {
    match describe_index(client, control_base, api_key, spec.name).await? {
        Some(described) => {
            if let Some(host) = ready_host(&described) {
                return normalize_host(&host);
            }
            tracing::info!(index = spec.name, "Pinecone index exists but is not ready yet");
        }
        None => {
            tracing::info!(
                index = spec.name,
                dimension = spec.dimension,
                cloud = spec.cloud,
                region = spec.region,
                "Creating Pinecone index"
            );
            create_index(client, control_base, api_key, spec).await?;
        }
    }

    await_ready(client, control_base, api_key, spec.name).await
}

async fn describe_index(
    client: &Client,
    control_base: &str,
    api_key: &str,
    name: &str,
) -> Result<Option<DescribeIndexResponse>, PineconeError> {
    let url = format_endpoint(control_base, &format!("indexes/{name}"));
    let response = client
        .get(url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-Api-Version", API_VERSION)
        .send()
        .await?;

    match response.status() {
        status if status.is_success() => Ok(Some(response.json().await?)),
        StatusCode::NOT_FOUND => Ok(None),
        status => {
            let body = response.text().await.unwrap_or_default();
            let error = PineconeError::UnexpectedStatus { status, body };
            tracing::error!(index = name, error = %error, "Index describe failed");
            Err(error)
        }
    }
}

async fn create_index(
    client: &Client,
    control_base: &str,
    api_key: &str,
    spec: &IndexSpec<'_>,
) -> Result<(), PineconeError> {
    let body = json!({
        "name": spec.name,
        "dimension": spec.dimension,
        "metric": "cosine",
        "spec": {
            "serverless": {
                "cloud": spec.cloud,
                "region": spec.region,
            }
        }
    });

    let url = format_endpoint(control_base, "indexes");
    let response = client
        .post(url)
        .header("Api-Key", api_key)
        .header("X-Pinecone-Api-Version", API_VERSION)
        .json(&body)
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = PineconeError::UnexpectedStatus { status, body };
        tracing::error!(index = spec.name, error = %error, "Index creation failed");
        Err(error)
    }
}

async fn await_ready(
    client: &Client,
    control_base: &str,
    api_key: &str,
    name: &str,
) -> Result<String, PineconeError> {
    for attempt in 0..READY_POLL_ATTEMPTS {
        if attempt > 0 {
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
        if let Some(described) = describe_index(client, control_base, api_key, name).await?
            && let Some(host) = ready_host(&described)
        {
            return normalize_host(&host);
        }
    }
    Err(PineconeError::NotReady(name.to_string()))
}

fn ready_host(described: &DescribeIndexResponse) -> Option<String> {
    let ready = described
        .status
        .as_ref()
        .map(|status| status.ready)
        .unwrap_or(false);
    match &described.host {
        Some(host) if ready && !host.is_empty() => Some(host.clone()),
        _ => None,
    }
}

fn normalize_host(host: &str) -> Result<String, PineconeError> {
    let trimmed = host.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(PineconeError::InvalidHost(host.to_string()));
    }
    let url = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    reqwest::Url::parse(&url).map_err(|err| PineconeError::InvalidHost(err.to_string()))?;
    Ok(url)
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
