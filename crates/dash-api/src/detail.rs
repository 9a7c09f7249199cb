//! Metadata and content lookup for a single result (`/2/dcs/get_link_metadata`)
//!
//! The file body comes back inline when `include_body` is set, so one call
//! covers both metadata and content.

use std::sync::Arc;

use dash_auth::AuthSession;
use serde_json::json;
use tracing::debug;

use crate::error::{Error, Result};
use crate::http::{ApiTransport, RetryPolicy};
use crate::models::{DetailRecord, MetadataResponse, RawFileMetadata};

const METADATA_ROUTE: &str = "/2/dcs/get_link_metadata";

#[derive(Clone)]
pub struct DetailClient {
    transport: ApiTransport,
}

impl DetailClient {
    pub fn new(http: reqwest::Client, session: Arc<AuthSession>, retry: RetryPolicy) -> Self {
        Self {
            transport: ApiTransport::new(http, session, retry),
        }
    }

    pub async fn details(&self, uuid: &str) -> Result<DetailRecord> {
        let uuid = uuid.trim();
        if uuid.is_empty() {
            return Err(Error::InvalidArgument("uuid must not be empty".into()));
        }

        let request = json!({
            "include_body": true,
            "url_or_uuids": [{"link_type": {".tag": "uuid", "uuid": uuid}}],
            "include_media_metadata": true,
            "include_preview_url": true,
        });
        let response: MetadataResponse = self.transport.call(METADATA_ROUTE, &request).await?;

        let Some(first) = response.results.into_iter().next() else {
            return Err(Error::NotFound(format!("no file found with UUID {uuid}")));
        };
        let metadata: RawFileMetadata = serde_json::from_value(first)
            .map_err(|e| Error::Upstream(format!("malformed metadata record for {uuid}: {e}")))?;

        if let Some(code) = metadata.error_code.as_deref() {
            let message = metadata.error_message.as_deref().unwrap_or(code);
            if code.contains("not_found") {
                return Err(Error::NotFound(format!("{uuid}: {message}")));
            }
            return Err(Error::Upstream(format!("metadata lookup failed ({code}): {message}")));
        }

        let record = metadata.normalize();
        debug!(
            has_media = record.media.is_some(),
            has_content = record.content.is_some(),
            "details fetched"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::test_support::authenticated_session;
    use crate::models::MAX_CONTENT_CHARS;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer, dir: &tempfile::TempDir) -> DetailClient {
        let session = authenticated_session(server, dir, "sl.valid").await;
        DetailClient::new(reqwest::Client::new(), session, RetryPolicy::default())
    }

    async fn mount_metadata(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path(METADATA_ROUTE))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn blank_uuid_is_invalid_argument() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, &dir).await.details("  ").await.unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn requests_by_uuid_with_body_and_media() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(METADATA_ROUTE))
            .and(body_partial_json(serde_json::json!({
                "include_body": true,
                "include_media_metadata": true,
                "url_or_uuids": [{"link_type": {".tag": "uuid", "uuid": "u-1"}}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [{
                    "title": "Q3 Plan",
                    "link": "https://example.com/q3",
                    "connector_info": {"connector_id": "dropbox"},
                    "body": {"blob_content": {"raw": "hello", "mime_type": "text/plain"}}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();

        let record = client(&server, &dir).await.details(" u-1 ").await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Q3 Plan"));
        assert_eq!(record.source_name.as_deref(), Some("dropbox"));
        assert_eq!(record.content.unwrap().text, "hello");
    }

    #[tokio::test]
    async fn mistyped_fields_are_dropped_not_fatal() {
        let server = MockServer::start().await;
        mount_metadata(
            &server,
            serde_json::json!({"results": [{
                "title": 42,
                "link": "https://example.com/q3",
                "connector_info": "dropbox",
                "media_metadata": [],
                "body": {"blob_content": {"raw": "hello", "mime_type": "text/plain"}}
            }]}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();

        let record = client(&server, &dir).await.details("u-1").await.unwrap();
        assert_eq!(record.title, None);
        assert_eq!(record.link.as_deref(), Some("https://example.com/q3"));
        assert_eq!(record.source_name, None);
        assert_eq!(record.media, None);
        assert_eq!(record.content.unwrap().text, "hello");
    }

    #[tokio::test]
    async fn non_object_result_is_upstream_error() {
        let server = MockServer::start().await;
        mount_metadata(&server, serde_json::json!({"results": ["oops"]})).await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, &dir).await.details("u-1").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn empty_results_is_not_found() {
        let server = MockServer::start().await;
        mount_metadata(&server, serde_json::json!({"results": []})).await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, &dir).await.details("missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn not_found_error_code_is_not_found() {
        let server = MockServer::start().await;
        mount_metadata(
            &server,
            serde_json::json!({"results": [{"error_code": "uuid_not_found"}]}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, &dir).await.details("gone").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn other_error_code_is_upstream_error() {
        let server = MockServer::start().await;
        mount_metadata(
            &server,
            serde_json::json!({"results": [{
                "error_code": "permission_denied",
                "error_message": "no access"
            }]}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();

        let err = client(&server, &dir).await.details("u").await.unwrap_err();
        assert!(matches!(err, Error::Upstream(_)), "got {err:?}");
        assert!(err.to_string().contains("no access"));
    }

    #[tokio::test]
    async fn long_body_is_truncated() {
        let server = MockServer::start().await;
        let body = "x".repeat(MAX_CONTENT_CHARS + 1234);
        mount_metadata(
            &server,
            serde_json::json!({"results": [{"body": {"blob_content": {"raw": body}}}]}),
        )
        .await;
        let dir = tempfile::tempdir().unwrap();

        let content = client(&server, &dir)
            .await
            .details("u")
            .await
            .unwrap()
            .content
            .unwrap();
        assert!(content.truncated);
        assert_eq!(content.text.len(), MAX_CONTENT_CHARS);
        assert_eq!(content.total_chars, MAX_CONTENT_CHARS + 1234);
    }
}
