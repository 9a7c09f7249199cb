//! Error taxonomy shared across crates
//!
//! Each crate keeps its own error enum; `ErrorKind` is the coarse class the
//! tool layer uses to decide how to report a failure and which remediation
//! to suggest.

use std::fmt;

/// Coarse classification of a failure, independent of which crate raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied bad input; retrying without changing it won't help.
    InvalidArgument,
    /// No usable credentials; the authorization flow must be (re)started.
    AuthRequired,
    /// The authorization exchange itself failed.
    AuthError,
    /// The call was valid but the target does not exist.
    NotFound,
    /// Network failure, timeout, or upstream overload. Safe to retry.
    TransientUpstream,
    /// App credentials or other settings are missing or invalid.
    Configuration,
    /// Local persistence failed (unreadable or corrupt token file).
    Storage,
    /// Upstream rejected the request for a non-transient reason.
    Upstream,
}

impl ErrorKind {
    /// Whether a caller may retry the same call unchanged.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientUpstream)
    }

    /// Stable snake_case label for logs.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::AuthRequired => "auth_required",
            ErrorKind::AuthError => "auth_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::TransientUpstream => "transient_upstream",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Storage => "storage",
            ErrorKind::Upstream => "upstream",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_is_retryable() {
        assert!(ErrorKind::TransientUpstream.is_retryable());
        assert!(!ErrorKind::AuthRequired.is_retryable());
        assert!(!ErrorKind::InvalidArgument.is_retryable());
        assert!(!ErrorKind::Upstream.is_retryable());
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(ErrorKind::AuthRequired.to_string(), "auth_required");
        assert_eq!(ErrorKind::TransientUpstream.to_string(), "transient_upstream");
    }
}
