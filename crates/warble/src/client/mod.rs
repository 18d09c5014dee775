//! MCP client for connecting to MCP servers.
//!
//! Streamable HTTP transport only: JSON-RPC payloads POSTed to a single
//! endpoint URL. This is the transport hosted MCP servers speak and the
//! recommended one for everything else.
//!
//! # Example
//!
//! ```rust,ignore
//! use warble::client::McpClient;
//!
//! let client = McpClient::new("http://localhost:8080/mcp");
//! client.initialize().await?;
//!
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("my_tool", json!({"arg": "value"})).await?;
//! ```

mod streamable;

pub use streamable::{ClientError, McpClient};

use serde::{Deserialize, Serialize};

/// Server information returned from initialize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    #[serde(default)]
    pub version: Option<String>,
}

/// Result of MCP initialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// Protocol version
    pub protocol_version: String,
    /// Server capabilities
    pub capabilities: serde_json::Value,
    /// Server info
    pub server_info: ServerInfo,
    /// Optional instructions for the LLM
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Options for configuring the MCP client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Client name for initialization
    pub client_name: String,
    /// Client version for initialization
    pub client_version: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Bearer token for hosted endpoints that require authorization
    pub bearer_token: Option<String>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            client_name: "warble-client".to_string(),
            client_version: env!("CARGO_PKG_VERSION").to_string(),
            timeout_secs: 30,
            bearer_token: None,
        }
    }
}

impl ClientOptions {
    /// Create options with custom client name.
    pub fn with_name(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            client_name: name.into(),
            client_version: version.into(),
            ..Default::default()
        }
    }

    /// Set the bearer token.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}
