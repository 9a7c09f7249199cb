//! Dropbox OAuth authentication library
//!
//! PKCE authorization-code flow, token exchange/refresh, token file storage,
//! and the [`AuthSession`] that ties them together for the MCP server.
//!
//! Credential flow:
//! 1. `AuthSession::authorization_url()` issues a URL with a PKCE challenge
//!    and a state nonce
//! 2. User authorizes in a browser and copies the code
//! 3. `AuthSession::complete_authorization()` redeems it via
//!    `token::exchange_code()` and persists the record through `TokenStore`
//! 4. `AuthSession::access_token()` refreshes via `token::refresh_token()`
//!    when the token is within a minute of expiry

pub mod account;
pub mod constants;
pub mod credentials;
pub mod error;
#[cfg(feature = "keyring")]
mod mirror;
pub mod pkce;
pub mod session;
pub mod token;

pub use account::AccountIdentity;
pub use constants::{AppCredentials, Endpoints};
pub use credentials::{TokenRecord, TokenStore};
pub use error::{Error, Result};
pub use session::{AuthSession, AuthorizationRequest, SessionState};
