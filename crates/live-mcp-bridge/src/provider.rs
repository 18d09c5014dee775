//! Tool providers and the MCP adapter.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use warble::{CallToolResult, ClientError, ClientOptions, McpClient};

use crate::config::ProviderConfig;
use crate::registry::{HandlerRegistry, RegistrationSummary};

/// A source of callable tools.
///
/// Implementations should stop work promptly once `cancel` fires; the
/// registry fires it when the dispatch deadline passes or the caller
/// abandons the invocation.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, ClientError>;
}

/// [`ToolProvider`] backed by a live MCP session.
pub struct McpProvider {
    client: Arc<McpClient>,
}

impl McpProvider {
    pub fn new(client: Arc<McpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToolProvider for McpProvider {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        cancel: CancellationToken,
    ) -> Result<CallToolResult, ClientError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                Err(ClientError::Transport("tool call cancelled".to_string()))
            }
            result = self.client.call_tool(name, arguments) => result,
        }
    }
}

/// Connect to one configured MCP provider and register every tool it
/// lists. Per-tool registration failures are logged and skipped inside
/// the registry; handshake and transport failures surface here.
#[tracing::instrument(skip(registry, config), fields(provider = %config.name, mcp.url = %config.url))]
pub async fn connect_and_register(
    registry: &mut HandlerRegistry,
    config: &ProviderConfig,
) -> Result<RegistrationSummary, ClientError> {
    let mut options = ClientOptions::with_name("live-mcp-bridge", env!("CARGO_PKG_VERSION"));
    if let Some(token) = &config.bearer_token {
        options = options.with_bearer_token(token);
    }

    let client = Arc::new(McpClient::with_options(&config.url, options));
    client.initialize().await?;
    let tools = client.list_tools().await?;
    tracing::info!(tool_count = tools.len(), "provider listed tools");

    let provider = Arc::new(McpProvider::new(client));
    Ok(registry.register(provider, &config.name, &tools))
}
