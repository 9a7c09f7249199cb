//! Error types for OAuth and credential operations

use common::ErrorKind;

/// Errors from the authorization flow, token endpoint, and token store.
///
/// `Clone` so a single refresh outcome can be handed to every caller that
/// was waiting on it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("authentication required: {0}")]
    AuthRequired(String),

    #[error("no authorization in progress; request an authorization URL first")]
    NoPendingAuthorization,

    #[error("this authorization was already completed; request a new authorization URL to authenticate again")]
    AuthorizationAlreadyCompleted,

    #[error("authorization request expired; request a new authorization URL")]
    AuthorizationExpired,

    #[error("state mismatch: the code belongs to a superseded authorization URL")]
    StateMismatch,

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map a transport error, separating timeouts from other failures.
    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(format!("{context}: {err}"))
        } else {
            Error::Http(format!("{context}: {err}"))
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) | Error::Timeout(_) => ErrorKind::TransientUpstream,
            Error::TokenExchange(_)
            | Error::NoPendingAuthorization
            | Error::AuthorizationAlreadyCompleted
            | Error::AuthorizationExpired
            | Error::StateMismatch => ErrorKind::AuthError,
            Error::InvalidCredentials(_) | Error::AuthRequired(_) => ErrorKind::AuthRequired,
            Error::CredentialParse(_) | Error::Io(_) => ErrorKind::Storage,
            Error::Config(_) => ErrorKind::Configuration,
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
