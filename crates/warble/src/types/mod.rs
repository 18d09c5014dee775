//! Wire types for the MCP client.

pub mod content;
pub mod tool;

pub use content::Content;
pub use tool::{CallToolResult, ToolInfo};
