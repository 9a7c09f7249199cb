//! Tool-level errors and their rendering as MCP results
//!
//! Bad input becomes an `invalid_params` protocol error. Every other failure
//! is returned as an error tool result whose text names the problem and what
//! the user should do next.

use common::ErrorKind;
use rmcp::ErrorData as McpError;
use rmcp::model::{CallToolResult, Content};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("{0}")]
    InvalidInput(String),

    #[error(transparent)]
    Auth(#[from] dash_auth::Error),

    #[error(transparent)]
    Api(#[from] dash_api::Error),
}

impl ToolError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ToolError::InvalidInput(_) => ErrorKind::InvalidArgument,
            ToolError::Auth(e) => e.kind(),
            ToolError::Api(e) => e.kind(),
        }
    }

    /// Convert into the tool's return value.
    pub fn into_tool_result(self, tool: &str) -> Result<CallToolResult, McpError> {
        let kind = self.kind();
        if kind == ErrorKind::InvalidArgument {
            return Err(McpError::invalid_params(self.to_string(), None));
        }

        warn!(tool, kind = %kind, error = %self, "tool call failed");
        let text = format!("{tool} failed: {self}\n\n{}", remediation(kind));
        Ok(CallToolResult::error(vec![Content::text(text)]))
    }
}

fn remediation(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::AuthRequired => {
            "Not authenticated with Dropbox. Call get-auth-url, approve access in the browser, \
             then call authenticate with the code shown."
        }
        ErrorKind::AuthError => {
            "Restart the authorization: call get-auth-url for a new URL, approve access, \
             then call authenticate with the new code."
        }
        ErrorKind::TransientUpstream => "Dropbox is temporarily unreachable. Retry the call shortly.",
        ErrorKind::Configuration => {
            "Set APP_KEY (and APP_SECRET if the app has one) in the environment or config file, \
             then restart the server."
        }
        ErrorKind::NotFound => "Check the UUID; it should come from a recent search result.",
        ErrorKind::Storage => {
            "Check that the data directory is writable and the token file is intact, \
             then authenticate again."
        }
        ErrorKind::Upstream => "Dropbox rejected the request. Adjust the input or try again later.",
        ErrorKind::InvalidArgument => "Fix the arguments and call the tool again.",
    }
}
