//! MCP tool definitions
//!
//! Each tool validates its arguments, delegates to the auth session or one of
//! the Dash clients, and renders plain text. Failures go through
//! [`ToolError::into_tool_result`].

use dash_api::search::MAX_RESULTS_LIMIT;
use dash_api::{FileType, SearchQuery};
use rmcp::{
    ErrorData as McpError,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content},
    schemars, tool, tool_router,
};
use serde::Deserialize;
use tracing::info;

use crate::error::ToolError;
use crate::render;
use crate::server::DashMcpServer;

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetAuthUrlParams {}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AuthenticateParams {
    /// The code shown by Dropbox after approving access.
    pub auth_code: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchParams {
    /// Search query text.
    pub query: String,
    /// One of "document", "image", "video", "audio", "pdf", "presentation",
    /// "spreadsheet". Omit (or use "document") for no filter.
    #[serde(default)]
    pub file_type: Option<String>,
    /// Maximum number of results, 1 to 100 (default 20).
    #[serde(default)]
    pub max_results: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetDetailsParams {
    /// Result UUID from a previous search.
    pub uuid: String,
}

fn text_result(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Split an optional `#state` suffix off the code. Dropbox only shows the
/// code itself; the suffix form comes from redirect-based setups that paste
/// back `code#state`. A missing or empty state is `None`.
fn split_auth_code(raw: &str) -> Result<(&str, Option<&str>), ToolError> {
    let (code, state) = match raw.trim().split_once('#') {
        Some((code, state)) => (code.trim(), Some(state.trim()).filter(|s| !s.is_empty())),
        None => (raw.trim(), None),
    };
    if code.is_empty() {
        return Err(ToolError::InvalidInput("auth_code must not be empty".into()));
    }
    Ok((code, state))
}

fn search_query(params: SearchParams) -> Result<SearchQuery, ToolError> {
    let mut query = SearchQuery::new(params.query);

    if let Some(raw) = params.file_type.as_deref().filter(|s| !s.trim().is_empty()) {
        let file_type: FileType = raw
            .parse()
            .map_err(|e: dash_api::UnknownFileType| ToolError::InvalidInput(e.to_string()))?;
        query = query.with_file_type(file_type);
    }

    if let Some(max) = params.max_results {
        let max = u32::try_from(max)
            .ok()
            .filter(|m| (1..=MAX_RESULTS_LIMIT).contains(m))
            .ok_or_else(|| {
                ToolError::InvalidInput(format!(
                    "max_results must be between 1 and {MAX_RESULTS_LIMIT}, got {max}"
                ))
            })?;
        query = query.with_max_results(max);
    }

    Ok(query)
}

#[tool_router]
impl DashMcpServer {
    pub(crate) fn create_tool_router() -> ToolRouter<Self> {
        Self::tool_router()
    }

    #[tool(
        name = "get-auth-url",
        description = "Start Dropbox authorization. Returns a URL for the user to open and approve; then call authenticate with the code Dropbox shows. Needed once; the token is stored and refreshed automatically."
    )]
    async fn get_auth_url(
        &self,
        Parameters(_p): Parameters<GetAuthUrlParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.session.authorization_url().await {
            Ok(request) => text_result(render::auth_url(&request)),
            Err(e) => ToolError::from(e).into_tool_result("get-auth-url"),
        }
    }

    #[tool(
        name = "authenticate",
        description = "Complete Dropbox authorization with the one-time code shown after approving the URL from get-auth-url. Returns the account name and email."
    )]
    async fn authenticate(
        &self,
        Parameters(p): Parameters<AuthenticateParams>,
    ) -> Result<CallToolResult, McpError> {
        let (code, state) = match split_auth_code(&p.auth_code) {
            Ok(parts) => parts,
            Err(e) => return e.into_tool_result("authenticate"),
        };
        match self.session.complete_authorization(code, state).await {
            Ok(identity) => {
                info!(account_id = %identity.account_id, "authenticated via tool");
                text_result(render::authenticated(&identity))
            }
            Err(e) => ToolError::from(e).into_tool_result("authenticate"),
        }
    }

    #[tool(
        name = "search",
        description = "Search company content indexed by Dropbox Dash. Optional file_type filter (document, image, video, audio, pdf, presentation, spreadsheet) and max_results (1-100, default 20). Each result lists a UUID usable with get-details."
    )]
    async fn search(
        &self,
        Parameters(p): Parameters<SearchParams>,
    ) -> Result<CallToolResult, McpError> {
        let query = match search_query(p) {
            Ok(query) => query,
            Err(e) => return e.into_tool_result("search"),
        };
        match self.search.search(&query).await {
            Ok(results) => text_result(render::search_results(query.query.trim(), &results)),
            Err(e) => ToolError::from(e).into_tool_result("search"),
        }
    }

    #[tool(
        name = "get-details",
        description = "Fetch metadata and file content for a search result UUID: title, link, timestamps, source, creator, media metadata, and up to 20000 characters of content."
    )]
    async fn get_details(
        &self,
        Parameters(p): Parameters<GetDetailsParams>,
    ) -> Result<CallToolResult, McpError> {
        let uuid = p.uuid.trim();
        match self.details.details(uuid).await {
            Ok(record) => text_result(render::details(uuid, &record)),
            Err(e) => ToolError::from(e).into_tool_result("get-details"),
        }
    }
}
