//! PKCE (Proof Key for Code Exchange) per RFC 7636, plus the state nonce
//!
//! The verifier stays in process memory; only its S256 challenge goes into
//! the authorization URL. The state nonce binds an issued URL to the code
//! that comes back from it.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Generate a random PKCE code verifier.
///
/// 64 random bytes encoded as URL-safe base64 without padding: 86
/// characters, inside the 43..=128 range RFC 7636 allows.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 64];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge: `BASE64URL(SHA256(verifier))`.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Generate an opaque state nonce (16 random bytes, base64url).
pub fn generate_state() -> String {
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the authorization URL.
///
/// `token_access_type=offline` asks Dropbox for a refresh token alongside the
/// short-lived access token.
pub fn build_authorization_url(
    authorize_endpoint: &str,
    client_id: &str,
    state: &str,
    challenge: &str,
) -> Result<String> {
    let url = Url::parse_with_params(
        authorize_endpoint,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("code_challenge", challenge),
            ("code_challenge_method", "S256"),
            ("token_access_type", "offline"),
            ("state", state),
        ],
    )
    .map_err(|e| Error::Config(format!("invalid authorize endpoint {authorize_endpoint}: {e}")))?;
    Ok(url.into())
}
