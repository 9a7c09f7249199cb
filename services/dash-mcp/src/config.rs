//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The app secret is loaded from APP_SECRET or `secret_file`, never stored
//! in the TOML directly to avoid leaking secrets. A missing config file is
//! fine; every setting has a default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use common::Secret;
use dash_api::RetryPolicy;
use dash_auth::constants::{API_BASE_URL, AUTHORIZE_ENDPOINT, TOKEN_ENDPOINT};
use dash_auth::{AppCredentials, Endpoints};
use serde::Deserialize;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "dash-mcp.toml";

/// Root configuration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
}

/// Dropbox app registration
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// App key (OAuth client id). Overridden by APP_KEY.
    pub key: Option<String>,
    /// Path to a file containing the app secret (alternative to APP_SECRET)
    pub secret_file: Option<PathBuf>,
    #[serde(skip)]
    pub secret: Option<Secret<String>>,
}

/// Token persistence
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
        }
    }
}

/// Upstream endpoints and HTTP behavior
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub authorize_url: String,
    pub token_url: String,
    pub api_base_url: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            timeout_secs: 30,
            max_retries: 2,
            retry_backoff_ms: 500,
        }
    }
}

impl Config {
    /// Load configuration, then overlay environment variables.
    ///
    /// With no explicit path, `dash-mcp.toml` is read if it exists and
    /// defaults are used otherwise. An explicit path must exist.
    ///
    /// App secret resolution order:
    /// 1. APP_SECRET env var
    /// 2. secret_file path from config
    pub fn load(path: Option<&Path>) -> common::Result<Self> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);
        let contents = match path {
            Some(p) => Some(std::fs::read_to_string(p)?),
            None if default_path.exists() => Some(std::fs::read_to_string(default_path)?),
            None => None,
        };

        let mut config = match contents {
            Some(c) => toml::from_str(&c)?,
            None => Config::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> common::Result<()> {
        if let Some(key) = non_empty_env("APP_KEY") {
            self.app.key = Some(key);
        }

        if let Some(secret) = non_empty_env("APP_SECRET") {
            self.app.secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = self.app.secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = Secret::new(secret.trim().to_owned());
            if !secret.is_blank() {
                self.app.secret = Some(secret);
            }
        }

        if let Some(dir) = non_empty_env("DASH_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    fn validate(&self) -> common::Result<()> {
        for (name, url) in [
            ("authorize_url", &self.upstream.authorize_url),
            ("token_url", &self.upstream.token_url),
            ("api_base_url", &self.upstream.api_base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(common::Error::Config(format!(
                    "{name} must start with http:// or https://, got: {url}"
                )));
            }
        }

        if self.upstream.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Resolve an explicit config path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&Path>) -> Option<PathBuf> {
        if let Some(p) = cli_path {
            return Some(p.to_path_buf());
        }
        non_empty_env("CONFIG_PATH").map(PathBuf::from)
    }

    /// App credentials, if a key is configured. The secret is optional.
    pub fn app_credentials(&self) -> Option<AppCredentials> {
        let key = self.app.key.as_deref().map(str::trim).filter(|k| !k.is_empty())?;
        Some(AppCredentials {
            client_id: key.to_string(),
            client_secret: self.app.secret.clone(),
        })
    }

    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            authorize_url: self.upstream.authorize_url.clone(),
            token_url: self.upstream.token_url.clone(),
            api_base_url: self.upstream.api_base_url.clone(),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.upstream.max_retries,
            backoff: Duration::from_millis(self.upstream.retry_backoff_ms),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.upstream.timeout_secs)
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}
