//! MCP server handler for Dropbox Dash.

use std::sync::Arc;

use dash_api::{DetailClient, SearchClient};
use dash_auth::AuthSession;
use rmcp::{
    ServerHandler,
    handler::server::router::tool::ToolRouter,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool_handler,
};

/// Exposes Dash authorization, search and file details as MCP tools.
#[derive(Clone)]
pub struct DashMcpServer {
    pub(crate) session: Arc<AuthSession>,
    pub(crate) search: SearchClient,
    pub(crate) details: DetailClient,
    tool_router: ToolRouter<Self>,
}

impl DashMcpServer {
    pub fn new(session: Arc<AuthSession>, search: SearchClient, details: DetailClient) -> Self {
        Self {
            session,
            search,
            details,
            tool_router: Self::create_tool_router(),
        }
    }
}

#[tool_handler]
impl ServerHandler for DashMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "dash-mcp-server".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                title: Some("Dropbox Dash MCP Server".into()),
                description: Some(
                    "Search company content indexed by Dropbox Dash and fetch file details."
                        .into(),
                ),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Dropbox Dash MCP Server. If not authenticated, call get-auth-url, have the \
                 user approve access in a browser, then call authenticate with the code. \
                 Use search to find content and get-details with a result UUID for metadata \
                 and file content."
                    .to_string(),
            ),
        }
    }
}
