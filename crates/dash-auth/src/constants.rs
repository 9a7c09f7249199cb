//! Dropbox OAuth endpoints and token lifecycle constants
//!
//! Endpoint URLs are defaults; `Endpoints` lets configuration (and tests)
//! point the session at another host.

use std::time::Duration;

use common::Secret;

/// Authorization page the user opens in a browser.
pub const AUTHORIZE_ENDPOINT: &str = "https://www.dropbox.com/oauth2/authorize";

/// Token endpoint for code exchange and refresh.
pub const TOKEN_ENDPOINT: &str = "https://api.dropboxapi.com/oauth2/token";

/// Base URL for RPC-style API calls (account lookup, Dash search).
pub const API_BASE_URL: &str = "https://api.dropboxapi.com";

/// File name of the persisted token record.
pub const TOKEN_FILE_NAME: &str = "dropbox_token.json";

/// Legacy subdirectory (relative to the data dir) holding an older token file.
pub const LEGACY_TOKEN_DIR: &str = "data";

/// Access tokens expiring within this window are refreshed before use.
pub const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Maximum age of an issued authorization URL before its verifier is discarded.
pub const AUTHORIZATION_TTL: Duration = Duration::from_secs(600);

/// Upstream endpoint locations.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
            api_base_url: API_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Join an API route (e.g. `/2/dcs/search`) onto the API base URL.
    pub fn api(&self, route: &str) -> String {
        format!("{}{}", self.api_base_url.trim_end_matches('/'), route)
    }
}

/// Registered app credentials (Dropbox "app key" and optional "app secret").
///
/// Without a secret the app authenticates as a public PKCE client.
#[derive(Debug, Clone)]
pub struct AppCredentials {
    pub client_id: String,
    pub client_secret: Option<Secret<String>>,
}
