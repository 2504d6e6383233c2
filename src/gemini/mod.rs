//! Gemini REST client for embeddings and analysis generation.

pub mod prompt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::get_config;

/// Input cap applied before embedding, in characters.
const MAX_EMBED_CHARS: usize = 30_000;
/// Maximum number of inputs per batch embedding request.
const EMBED_BATCH_SIZE: usize = 100;
/// Sampling temperature used for analysis generation.
const ANALYSIS_TEMPERATURE: f32 = 0.1;

/// Errors returned while talking to the Gemini API.
#[derive(Debug, Error)]
pub enum GeminiError {
    /// Base URL failed to parse.
    #[error("Invalid Gemini base URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Gemini responded with an unexpected status code.
    #[error("Unexpected Gemini response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned from Gemini.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Gemini returned fewer embeddings than inputs.
    #[error("Gemini returned no embedding for the input")]
    MissingEmbedding,
    /// Gemini returned no usable candidate text.
    #[error("Gemini returned no candidates for the prompt")]
    EmptyResponse,
}

/// Lightweight HTTP client for the Gemini REST endpoints.
pub struct GeminiClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: String,
    pub(crate) embedding_model: String,
    pub(crate) generation_model: String,
    pub(crate) max_output_tokens: u32,
}

impl GeminiClient {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, GeminiError> {
        let config = get_config();
        let client = Client::builder().user_agent("docquery/0.2").build()?;
        let base_url = normalize_base_url(&config.gemini_base_url)?;
        tracing::debug!(
            url = %base_url,
            embedding_model = %config.embedding_model,
            generation_model = %config.llm_model,
            "Initialized Gemini HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.gemini_api_key.clone(),
            embedding_model: config.embedding_model.clone(),
            generation_model: config.llm_model.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Embed document chunks for indexing, batching requests as needed.
    ///
    /// Returns one vector per input, in input order.
    pub async fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, GeminiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(EMBED_BATCH_SIZE) {
            let requests: Vec<EmbedRequest> = batch
                .iter()
                .map(|text| EmbedRequest {
                    model: self.embedding_model.clone(),
                    content: ContentParts::from_text(&normalize_for_embedding(text)),
                    task_type: TaskType::RetrievalDocument,
                })
                .collect();

            let response = self
                .request(&format!("{}:batchEmbedContents", self.embedding_model))
                .json(&BatchEmbedRequest { requests })
                .send()
                .await?;
            let payload: BatchEmbedResponse = self.read_json(response, "batchEmbedContents").await?;

            if payload.embeddings.len() != batch.len() {
                tracing::error!(
                    expected = batch.len(),
                    actual = payload.embeddings.len(),
                    "Gemini returned a partial embedding batch"
                );
                return Err(GeminiError::MissingEmbedding);
            }
            vectors.extend(payload.embeddings.into_iter().map(|entry| entry.values));
        }

        Ok(vectors)
    }

    /// Embed a query for retrieval.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, GeminiError> {
        let body = EmbedRequest {
            model: self.embedding_model.clone(),
            content: ContentParts::from_text(&normalize_for_embedding(text)),
            task_type: TaskType::RetrievalQuery,
        };

        let response = self
            .request(&format!("{}:embedContent", self.embedding_model))
            .json(&body)
            .send()
            .await?;
        let payload: EmbedResponse = self.read_json(response, "embedContent").await?;

        if payload.embedding.values.is_empty() {
            return Err(GeminiError::MissingEmbedding);
        }
        Ok(payload.embedding.values)
    }

    /// Generate an analysis for the prompt and return the candidate text.
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let body = GenerateRequest {
            contents: vec![ContentParts::from_text(prompt)],
            generation_config: GenerationConfig {
                temperature: ANALYSIS_TEMPERATURE,
                max_output_tokens: self.max_output_tokens,
                candidate_count: 1,
            },
        };

        let response = self
            .request(&format!("{}:generateContent", self.generation_model))
            .json(&body)
            .send()
            .await?;
        let payload: GenerateResponse = self.read_json(response, "generateContent").await?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(GeminiError::EmptyResponse);
        }
        Ok(text)
    }

    fn request(&self, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client.post(url).header("x-goog-api-key", &self.api_key)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
        operation: &str,
    ) -> Result<T, GeminiError> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = GeminiError::UnexpectedStatus { status, body };
            tracing::error!(operation, error = %error, "Gemini request failed");
            return Err(error);
        }
        Ok(response.json().await?)
    }
}

/// Collapse whitespace and cap the input length before embedding.
fn normalize_for_embedding(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= MAX_EMBED_CHARS {
        return collapsed;
    }
    let mut truncated: String = collapsed.chars().take(MAX_EMBED_CHARS).collect();
    truncated.push_str("...");
    truncated
}

fn normalize_base_url(url: &str) -> Result<String, GeminiError> {
    let parsed =
        reqwest::Url::parse(url).map_err(|err| GeminiError::InvalidUrl(err.to_string()))?;
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedRequest>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedRequest {
    model: String,
    content: ContentParts,
    task_type: TaskType,
}

#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum TaskType {
    RetrievalDocument,
    RetrievalQuery,
}

#[derive(Serialize)]
struct ContentParts {
    parts: Vec<TextPart>,
}

impl ContentParts {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![TextPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize, Deserialize)]
struct TextPart {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<ContentParts>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    candidate_count: u32,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<TextPart>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn test_client(base_url: String) -> GeminiClient {
        GeminiClient {
            client: Client::builder()
                .user_agent("docquery-test")
                .build()
                .expect("client"),
            base_url,
            api_key: "test-key".into(),
            embedding_model: "models/text-embedding-004".into(),
            generation_model: "models/gemini-2.5-flash".into(),
            max_output_tokens: 256,
        }
    }

    #[tokio::test]
    async fn embed_query_emits_expected_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/text-embedding-004:embedContent")
                    .header("x-goog-api-key", "test-key")
                    .json_body(json!({
                        "model": "models/text-embedding-004",
                        "content": { "parts": [ { "text": "What is covered?" } ] },
                        "taskType": "RETRIEVAL_QUERY"
                    }));
                then.status(200).json_body(json!({
                    "embedding": { "values": [0.1, 0.2, 0.3] }
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let vector = client.embed_query("What  is\ncovered?").await.expect("embedding");

        mock.assert();
        assert_eq!(vector, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn embed_documents_sends_batch_and_preserves_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/text-embedding-004:batchEmbedContents")
                    .json_body(json!({
                        "requests": [
                            {
                                "model": "models/text-embedding-004",
                                "content": { "parts": [ { "text": "first chunk" } ] },
                                "taskType": "RETRIEVAL_DOCUMENT"
                            },
                            {
                                "model": "models/text-embedding-004",
                                "content": { "parts": [ { "text": "second chunk" } ] },
                                "taskType": "RETRIEVAL_DOCUMENT"
                            }
                        ]
                    }));
                then.status(200).json_body(json!({
                    "embeddings": [
                        { "values": [1.0, 0.0] },
                        { "values": [0.0, 1.0] }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let vectors = client
            .embed_documents(&["first chunk".to_string(), "second chunk".to_string()])
            .await
            .expect("embeddings");

        mock.assert();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn embed_documents_rejects_partial_batches() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/text-embedding-004:batchEmbedContents");
                then.status(200)
                    .json_body(json!({ "embeddings": [ { "values": [0.5] } ] }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client
            .embed_documents(&["one".to_string(), "two".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(error, GeminiError::MissingEmbedding));
    }

    #[tokio::test]
    async fn generate_returns_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-2.5-flash:generateContent")
                    .header("x-goog-api-key", "test-key");
                then.status(200).json_body(json!({
                    "candidates": [
                        {
                            "content": {
                                "parts": [ { "text": "{\"answer\": \"Yes\"}" } ]
                            }
                        }
                    ]
                }));
            })
            .await;

        let client = test_client(server.base_url());
        let text = client.generate("Analyze this").await.expect("generation");

        mock.assert();
        assert_eq!(text, "{\"answer\": \"Yes\"}");
    }

    #[tokio::test]
    async fn generate_rejects_empty_candidates() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-2.5-flash:generateContent");
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.generate("Analyze this").await.unwrap_err();
        assert!(matches!(error, GeminiError::EmptyResponse));
    }

    #[tokio::test]
    async fn surfaces_unexpected_status_with_body() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/text-embedding-004:embedContent");
                then.status(429).body("quota exhausted");
            })
            .await;

        let client = test_client(server.base_url());
        let error = client.embed_query("anything").await.unwrap_err();
        match error {
            GeminiError::UnexpectedStatus { status, body } => {
                assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
                assert_eq!(body, "quota exhausted");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(
            normalize_for_embedding("  hello \n\t world  "),
            "hello world"
        );
    }

    #[test]
    fn normalize_truncates_long_input_with_ellipsis() {
        let long_input = "x".repeat(MAX_EMBED_CHARS + 50);
        let normalized = normalize_for_embedding(&long_input);
        assert_eq!(normalized.chars().count(), MAX_EMBED_CHARS + 3);
        assert!(normalized.ends_with("..."));
    }
}
