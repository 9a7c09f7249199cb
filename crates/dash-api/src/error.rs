//! Error types for Dash search and metadata calls

use common::ErrorKind;

#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("upstream temporarily unavailable: {0}")]
    Transient(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Auth(#[from] dash_auth::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Upstream(_) => ErrorKind::Upstream,
            Error::Transient(_) | Error::Timeout(_) => ErrorKind::TransientUpstream,
            Error::Auth(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
