//! Configuration error types

use thiserror::Error;

use crate::ErrorKind;

/// Errors raised while loading and validating configuration.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Configuration
    }
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let config_err = Error::Config("APP_KEY is not set".into());
        assert_eq!(
            config_err.to_string(),
            "Configuration error: APP_KEY is not set"
        );

        let io_err = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        assert!(io_err.to_string().starts_with("I/O error:"), "got: {io_err}");
    }

    #[test]
    fn every_variant_is_a_configuration_failure() {
        let err = Error::Config("bad value".into());
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
