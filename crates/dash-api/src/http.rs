//! Authenticated JSON POST transport shared by the search and detail clients
//!
//! Transient failures (connect errors, 429, 500, 502, 503, 504) are retried
//! with exponential backoff, honoring `Retry-After`. Timeouts are surfaced
//! immediately. A 401 invalidates the session's access token and the call is
//! replayed once with a fresh one.

use std::sync::Arc;
use std::time::Duration;

use dash_auth::AuthSession;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Upper bound on a server-requested `Retry-After` delay.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Retry behavior for transient upstream failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Additional attempts after the first.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent one.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            backoff: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn delay(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        retry_after.unwrap_or_else(|| self.backoff.saturating_mul(2u32.saturating_pow(attempt)))
    }
}

enum Reply {
    Body(String),
    Unauthorized,
}

/// Dropbox RPC error envelope (`{"error_summary": "...", "error": {...}}`).
#[derive(Debug, Default, serde::Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error_summary: Option<String>,
}

#[derive(Clone)]
pub(crate) struct ApiTransport {
    http: reqwest::Client,
    session: Arc<AuthSession>,
    retry: RetryPolicy,
}

impl ApiTransport {
    pub(crate) fn new(http: reqwest::Client, session: Arc<AuthSession>, retry: RetryPolicy) -> Self {
        Self {
            http,
            session,
            retry,
        }
    }

    /// POST `body` to `route` and decode the JSON response.
    pub(crate) async fn call<B, R>(&self, route: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let token = self.session.access_token().await?;
        let text = match self.post(route, body, &token).await? {
            Reply::Body(text) => text,
            Reply::Unauthorized => {
                warn!(route, "access token rejected, refreshing and retrying once");
                self.session.invalidate_access_token(&token).await;
                let token = self.session.access_token().await?;
                match self.post(route, body, &token).await? {
                    Reply::Body(text) => text,
                    Reply::Unauthorized => {
                        return Err(dash_auth::Error::AuthRequired(
                            "Dropbox rejected the access token".into(),
                        )
                        .into());
                    }
                }
            }
        };

        serde_json::from_str(&text)
            .map_err(|e| Error::Upstream(format!("invalid {route} response: {e}")))
    }

    async fn post<B>(&self, route: &str, body: &B, token: &str) -> Result<Reply>
    where
        B: Serialize + ?Sized,
    {
        let url = self.session.endpoints().api(route);
        let max_retries = self.retry.max_retries;

        for attempt in 0..=max_retries {
            let response = match self
                .http
                .post(&url)
                .bearer_auth(token)
                .json(body)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) if e.is_timeout() => {
                    return Err(Error::Timeout(format!("{route}: {e}")));
                }
                Err(e) if attempt < max_retries => {
                    let delay = self.retry.delay(attempt, None);
                    warn!(route, attempt, error = %e, delay_ms = delay.as_millis() as u64, "request failed, will retry");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Err(e) => return Err(Error::Transient(format!("{route}: {e}"))),
            };

            let status = response.status();
            debug!(route, status = %status, attempt, "response received");

            if status.is_success() {
                let text = response.text().await.map_err(|e| {
                    if e.is_timeout() {
                        Error::Timeout(format!("reading {route} response: {e}"))
                    } else {
                        Error::Transient(format!("reading {route} response: {e}"))
                    }
                })?;
                return Ok(Reply::Body(text));
            }

            if status == StatusCode::UNAUTHORIZED {
                return Ok(Reply::Unauthorized);
            }

            if is_transient_status(status) {
                if attempt < max_retries {
                    let delay = self.retry.delay(attempt, retry_after(response.headers()));
                    warn!(route, status = %status, attempt, delay_ms = delay.as_millis() as u64, "transient error, will retry");
                    tokio::time::sleep(delay).await;
                    continue;
                }
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Transient(format!(
                    "{route} returned {status} after {} attempts: {}",
                    attempt + 1,
                    summarize(&body)
                )));
            }

            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(route, status, &body));
        }

        Err(Error::Transient(format!("{route}: retries exhausted")))
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// `Retry-After` in delta-seconds form, capped at [`MAX_RETRY_AFTER`].
/// HTTP-date values are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    if secs.is_nan() || secs < 0.0 {
        return None;
    }
    // Out-of-range values (huge or infinite) fail conversion; clamp them
    Some(Duration::try_from_secs_f64(secs).map_or(MAX_RETRY_AFTER, |d| d.min(MAX_RETRY_AFTER)))
}

fn summarize(body: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(body)
        .ok()
        .and_then(|b| b.error_summary)
        .unwrap_or_else(|| body.chars().take(200).collect())
}

fn classify_failure(route: &str, status: StatusCode, body: &str) -> Error {
    let summary = summarize(body);
    if status == StatusCode::NOT_FOUND
        || (status == StatusCode::CONFLICT && summary.contains("not_found"))
    {
        return Error::NotFound(summary);
    }
    Error::Upstream(format!("{route} returned {status}: {summary}"))
}
