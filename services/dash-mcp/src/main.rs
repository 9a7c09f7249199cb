//! Dropbox Dash MCP Server
//!
//! Exposes Dropbox Dash authorization, company search and file details to
//! LLM agents over the Model Context Protocol on `stdio`.

mod config;
mod error;
mod render;
mod server;
mod tools;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use dash_api::{DetailClient, SearchClient};
use dash_auth::{AuthSession, TokenStore};
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::server::DashMcpServer;

/// Dropbox Dash MCP Server: search company content from an AI agent.
#[derive(Parser, Debug)]
#[command(name = "dash-mcp-server", version, about)]
struct Args {
    /// Path to a TOML config file (default: dash-mcp.toml if present).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the stored token.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Delete the stored token and exit.
    #[arg(long)]
    clear_token: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // stdout is the MCP transport, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let config_path = Config::resolve_path(args.config.as_deref());
    let mut config = Config::load(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("failed to load config from {}", path.display()),
        None => "failed to load config".to_string(),
    })?;
    if let Some(dir) = args.data_dir {
        config.storage.data_dir = dir;
    }

    let store = TokenStore::new(&config.storage.data_dir);
    #[cfg(feature = "keyring")]
    let store = store.with_keyring_mirror("dash-mcp");

    if args.clear_token {
        store.clear().await.context("failed to clear stored token")?;
        eprintln!("Removed stored token at {}", store.path().display());
        return Ok(());
    }

    info!(
        data_dir = %config.storage.data_dir.display(),
        api_base_url = %config.upstream.api_base_url,
        timeout_secs = config.upstream.timeout_secs,
        "configuration loaded"
    );

    let app = config.app_credentials();
    if app.is_none() {
        warn!("APP_KEY not set; authorization tools will fail until it is configured");
    }

    let http = reqwest::Client::builder()
        .timeout(config.timeout())
        .build()
        .context("failed to build HTTP client")?;

    let session = Arc::new(AuthSession::new(http.clone(), config.endpoints(), app, store));
    let state = session.initialize().await;
    info!(state = ?state, "starting Dropbox Dash MCP server");

    let retry = config.retry_policy();
    let server = DashMcpServer::new(
        session.clone(),
        SearchClient::new(http.clone(), session.clone(), retry),
        DetailClient::new(http, session, retry),
    );

    let service = server
        .serve(stdio())
        .await
        .context("failed to start MCP stdio service")?;
    service.waiting().await?;

    Ok(())
}
