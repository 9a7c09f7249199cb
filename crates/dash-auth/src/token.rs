//! OAuth token exchange and refresh
//!
//! Both operations POST a form to the token endpoint with different grant
//! types. Neither is retried here: a code can only be redeemed once, and the
//! session coalesces refreshes itself.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{AppCredentials, Endpoints};
use crate::credentials::TokenRecord;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds. Dropbox omits `refresh_token` on
/// refresh responses; the caller carries the previous one forward.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub account_id: Option<String>,
}

impl TokenResponse {
    /// Convert into a storable record with an absolute expiry.
    pub fn into_record(
        self,
        previous_refresh: Option<String>,
        previous_account: Option<String>,
        now_millis: u64,
    ) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(previous_refresh),
            expires_at: self
                .expires_in
                .map(|secs| now_millis.saturating_add(secs.saturating_mul(1000))),
            account_id: self.account_id.or(previous_account),
        }
    }
}

/// OAuth error body (`{"error": "...", "error_description": "..."}`).
#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl OAuthErrorBody {
    fn parse(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    /// Human-readable cause, preferring the description.
    fn message(&self, fallback: &str) -> String {
        self.error_description
            .clone()
            .or_else(|| self.error.clone())
            .unwrap_or_else(|| fallback.to_string())
    }
}

/// Exchange an authorization code for tokens.
///
/// The PKCE verifier proves this process issued the authorization URL the
/// code came from. The client secret is sent only when one is configured.
pub async fn exchange_code(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    app: &AppCredentials,
    code: &str,
    verifier: &str,
) -> Result<TokenResponse> {
    let mut form = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("code_verifier", verifier),
        ("client_id", app.client_id.as_str()),
    ];
    if let Some(secret) = &app.client_secret {
        form.push(("client_secret", secret.expose().as_str()));
    }

    let response = client
        .post(&endpoints.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::from_reqwest("token exchange request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let cause = OAuthErrorBody::parse(&body).message("unknown error");
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {cause}"
        )));
    }

    debug!("authorization code exchanged");
    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("reading token response: {e}"))
            } else {
                Error::TokenExchange(format!("invalid token response: {e}"))
            }
        })
}

/// Obtain a new access token using a refresh token.
///
/// `invalid_grant` (or 401/403) means the refresh token was revoked or has
/// expired and is reported as `InvalidCredentials`; anything else is treated
/// as a failed but retryable exchange.
pub async fn refresh_token(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    app: &AppCredentials,
    refresh: &str,
) -> Result<TokenResponse> {
    let mut form = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh),
        ("client_id", app.client_id.as_str()),
    ];
    if let Some(secret) = &app.client_secret {
        form.push(("client_secret", secret.expose().as_str()));
    }

    let response = client
        .post(&endpoints.token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::from_reqwest("token refresh request failed", e))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let parsed = OAuthErrorBody::parse(&body);
        let cause = parsed.message("unknown error");

        let revoked = matches!(status.as_u16(), 401 | 403)
            || parsed.error.as_deref() == Some("invalid_grant");
        if revoked {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {cause}"
            )));
        }

        return Err(Error::Http(format!(
            "token refresh returned {status}: {cause}"
        )));
    }

    debug!("access token refreshed");
    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                Error::Timeout(format!("reading refresh response: {e}"))
            } else {
                Error::TokenExchange(format!("invalid refresh response: {e}"))
            }
        })
}
