//! warble - MCP (Model Context Protocol) client library
//!
//! A client-side implementation of the MCP 2025-06-18 specification using the
//! Streamable HTTP transport: JSON-RPC 2.0 payloads POSTed to a single
//! endpoint, with a client-generated session id.
//!
//! # Example
//!
//! ```rust,ignore
//! use warble::{McpClient, ClientOptions};
//!
//! let client = McpClient::with_options(
//!     "https://mcp.example.com/mcp",
//!     ClientOptions::with_name("my-assistant", "0.1.0"),
//! );
//! client.initialize().await?;
//!
//! let tools = client.list_tools().await?;
//! let result = client.call_tool("search", json!({"query": "hello"})).await?;
//! ```

pub mod client;
pub mod types;

// Re-export commonly used types at crate root
pub use client::{ClientError, ClientOptions, InitializeResult, McpClient, ServerInfo};
pub use types::content::Content;
pub use types::tool::{CallToolResult, ToolInfo};
