//! Streaming helpers for walking Pinecone id listings without manual paging.

use async_stream::try_stream;
use futures_core::Stream;

use super::client::PineconeService;
use super::types::PineconeError;

const LIST_PAGE_LIMIT: usize = 100;

/// Stream pages of vector ids whose id starts with `prefix`.
///
/// Each item is one page from the list endpoint. Pagination tokens are
/// followed until the server stops returning one; empty pages are skipped.
pub fn stream_id_pages<'a>(
    service: &'a PineconeService,
    prefix: &'a str,
) -> impl Stream<Item = Result<Vec<String>, PineconeError>> + 'a {
    try_stream! {
        let mut token: Option<String> = None;

        loop {
            let page = service
                .list_id_page(prefix, token.as_deref(), LIST_PAGE_LIMIT)
                .await?;

            let ids: Vec<String> = page.vectors.into_iter().map(|vector| vector.id).collect();
            if !ids.is_empty() {
                yield ids;
            }

            match page.pagination.and_then(|pagination| pagination.next) {
                Some(next) => token = Some(next),
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{pin_mut, stream::StreamExt};
    use httpmock::{prelude::HttpMockRequest, Method::GET, MockServer};
    use serde_json::json;

    fn test_service(host: String) -> PineconeService {
        PineconeService {
            client: reqwest::Client::builder()
                .user_agent("docquery-test")
                .build()
                .expect("client"),
            host,
            api_key: "test-key".into(),
        }
    }

    #[tokio::test]
    async fn stream_id_pages_follows_pagination_tokens() {
        let server = MockServer::start_async().await;

        let first = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/vectors/list")
                    .query_param("prefix", "doc-3:")
                    .matches(|req: &HttpMockRequest| {
                        req.query_params
                            .as_ref()
                            .map(|params| params.iter().all(|(key, _)| key != "paginationToken"))
                            .unwrap_or(true)
                    });
                then.status(200).json_body(json!({
                    "vectors": [ { "id": "doc-3:0" }, { "id": "doc-3:1" } ],
                    "pagination": { "next": "tok-1" }
                }));
            })
            .await;

        let second = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/vectors/list")
                    .query_param("prefix", "doc-3:")
                    .query_param("paginationToken", "tok-1");
                then.status(200).json_body(json!({
                    "vectors": [ { "id": "doc-3:2" } ],
                    "pagination": null
                }));
            })
            .await;

        let service = test_service(server.base_url());
        let stream = stream_id_pages(&service, "doc-3:");
        pin_mut!(stream);
        let mut pages = Vec::new();
        while let Some(page) = stream.next().await {
            pages.push(page.expect("id page"));
        }

        first.assert();
        second.assert();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0], vec!["doc-3:0".to_string(), "doc-3:1".to_string()]);
        assert_eq!(pages[1], vec!["doc-3:2".to_string()]);
    }

    #[tokio::test]
    async fn stream_id_pages_skips_empty_listings() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/vectors/list");
                then.status(200).json_body(json!({ "vectors": [] }));
            })
            .await;

        let service = test_service(server.base_url());
        let stream = stream_id_pages(&service, "missing:");
        pin_mut!(stream);
        let mut pages = 0usize;
        while let Some(page) = stream.next().await {
            page.expect("id page");
            pages += 1;
        }

        assert_eq!(pages, 0);
    }

    #[tokio::test]
    async fn stream_id_pages_surfaces_endpoint_errors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/vectors/list");
                then.status(400).body("listing is unsupported for this index");
            })
            .await;

        let service = test_service(server.base_url());
        let stream = stream_id_pages(&service, "doc-3:");
        pin_mut!(stream);
        let error = stream
            .next()
            .await
            .expect("one item")
            .expect_err("listing should fail");
        assert!(matches!(
            error,
            PineconeError::UnexpectedStatus { status, .. } if status == reqwest::StatusCode::BAD_REQUEST
        ));
    }
}
