//! Company-content search (`/2/dcs/search`)

use std::sync::Arc;

use dash_auth::AuthSession;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::http::{ApiTransport, RetryPolicy};
use crate::models::{FileType, RawQueryResult, SearchResponse, SearchResult};

const SEARCH_ROUTE: &str = "/2/dcs/search";

pub const DEFAULT_MAX_RESULTS: u32 = 20;
pub const MAX_RESULTS_LIMIT: u32 = 100;

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub file_type: Option<FileType>,
    pub max_results: u32,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            file_type: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    pub fn with_file_type(mut self, file_type: FileType) -> Self {
        self.file_type = Some(file_type);
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    fn validate(&self) -> Result<&str> {
        let query = self.query.trim();
        if query.is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".into()));
        }
        if !(1..=MAX_RESULTS_LIMIT).contains(&self.max_results) {
            return Err(Error::InvalidArgument(format!(
                "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {}",
                self.max_results
            )));
        }
        if self.file_type == Some(FileType::Unknown) {
            return Err(Error::InvalidArgument(
                "file_type 'unknown' cannot be used as a filter".into(),
            ));
        }
        Ok(query)
    }
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query_text: &'a str,
    filters: Vec<SearchFilter>,
    query_options: QueryOptions,
    max_results: u32,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum SearchFilter {
    FileTypeFilter { file_types: Vec<FileType> },
}

#[derive(Debug, Serialize)]
struct QueryOptions {
    disable_spell_correction: bool,
}

/// Search client bound to the shared auth session.
#[derive(Clone)]
pub struct SearchClient {
    transport: ApiTransport,
}

impl SearchClient {
    pub fn new(http: reqwest::Client, session: Arc<AuthSession>, retry: RetryPolicy) -> Self {
        Self {
            transport: ApiTransport::new(http, session, retry),
        }
    }

    /// Run a search and normalize the hits, in upstream order.
    ///
    /// Input is validated before a token is requested. Individual records
    /// that fail to decode are skipped.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let query_text = query.validate()?;

        // "document" is the upstream default scope, so it is sent unfiltered
        let filters = match query.file_type {
            None | Some(FileType::Document) => Vec::new(),
            Some(file_type) => vec![SearchFilter::FileTypeFilter {
                file_types: vec![file_type],
            }],
        };
        let request = SearchRequest {
            query_text,
            filters,
            query_options: QueryOptions {
                disable_spell_correction: false,
            },
            max_results: query.max_results,
        };

        let response: SearchResponse = self.transport.call(SEARCH_ROUTE, &request).await?;

        let received = response.results.len();
        let results: Vec<SearchResult> = response
            .results
            .into_iter()
            .filter_map(|mut item| {
                let raw = item.get_mut("query_result").map(serde_json::Value::take)?;
                serde_json::from_value::<RawQueryResult>(raw)
                    .ok()
                    .and_then(RawQueryResult::normalize)
            })
            .collect();

        let skipped = received - results.len();
        if skipped > 0 {
            warn!(skipped, received, "skipped malformed search results");
        }
        debug!(returned = results.len(), "search completed");

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::authenticated_session;
    use crate::models::ResultBody;
    use std::time::Duration;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    async fn client(server: &MockServer, dir: &tempfile::TempDir) -> SearchClient {
        let session = authenticated_session(server, dir, "sl.valid").await;
        SearchClient::new(reqwest::Client::new(), session, fast_retry())
    }

    #[tokio::test]
    async fn invalid_input_makes_no_network_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let client = client(&server, &dir).await;

        for query in [
            SearchQuery::new("   "),
            SearchQuery::new("q").with_max_results(0),
            SearchQuery::new("q").with_max_results(101),
            SearchQuery::new("q").with_file_type(FileType::Unknown),
        ] {
            let err = client.search(&query).await.unwrap_err();
            assert!(matches!(err, Error::InvalidArgument(_)), "got {err:?}");
        }
    }

    #[tokio::test]
    async fn sends_expected_request_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_ROUTE))
            .and(header("authorization", "Bearer sl.valid"))
            .and(body_json(serde_json::json!({
                "query_text": "roadmap",
                "filters": [{"type": "file_type_filter", "file_types": ["pdf"]}],
                "query_options": {"disable_spell_correction": false},
                "max_results": 5
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let query = SearchQuery::new("  roadmap ")
            .with_file_type(FileType::Pdf)
            .with_max_results(5);
        let results = client(&server, &dir).await.search(&query).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn document_filter_is_sent_unfiltered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_ROUTE))
            .and(body_string_contains(r#""filters":[]"#))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let query = SearchQuery::new("notes").with_file_type(FileType::Document);
        client(&server, &dir).await.search(&query).await.unwrap();
    }

    #[tokio::test]
    async fn normalizes_mixed_records_and_skips_bad_ones() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {"query_result": {"uuid": "f-1", "record_type": {".tag": "file"}, "title": "Plan"}},
                    {"query_result": {"title": "no uuid"}},
                    {"query_result": {"uuid": "p-1", "record_type": "person", "display_name": "Ada"}},
                    {"something_else": true},
                    {"query_result": {"uuid": "bad", "relevance_score": "high"}},
                    {"query_result": {"uuid": "l-1", "record_type": "link", "url": "https://x"}}
                ]
            })))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let results = client(&server, &dir)
            .await
            .search(&SearchQuery::new("plan"))
            .await
            .unwrap();

        let uuids: Vec<&str> = results.iter().map(|r| r.uuid.as_str()).collect();
        assert_eq!(uuids, ["f-1", "p-1", "l-1"]);
        assert!(matches!(results[0].body, ResultBody::Content(_)));
        assert!(matches!(results[1].body, ResultBody::Person(_)));
    }

    #[tokio::test]
    async fn unauthorized_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_ROUTE))
            .and(header("authorization", "Bearer sl.valid"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "sl.refreshed",
                "expires_in": 14400
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(SEARCH_ROUTE))
            .and(header("authorization", "Bearer sl.refreshed"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{"query_result": {"uuid": "f-1", "title": "Plan"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let results = client(&server, &dir)
            .await
            .search(&SearchQuery::new("plan"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn repeated_unauthorized_is_auth_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SEARCH_ROUTE))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "sl.refreshed",
                "expires_in": 14400
            })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, &dir)
            .await
            .search(&SearchQuery::new("plan"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), common::ErrorKind::AuthRequired);
    }
}
