//! Tool Types
//!
//! Tool descriptions from tools/list and results from tools/call.
//! Per MCP 2025-06-18 schema lines 2353-2487.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::Content;

/// A tool as advertised by the server.
///
/// The input schema is kept as a raw JSON value: servers ship the full
/// JSON-Schema dialect (unions, additionalProperties, nested constraints)
/// and consumers decide how much of it they can use.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    /// Programmatic name of the tool.
    pub name: String,

    /// Human-readable title (optional).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Description for the LLM.
    #[serde(default)]
    pub description: Option<String>,

    /// JSON Schema for input parameters, unmodified.
    pub input_schema: Value,
}

impl ToolInfo {
    /// Create a tool description with an input schema.
    pub fn new(name: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            input_schema,
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Result of a tools/call request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    /// Content blocks representing the result.
    #[serde(default)]
    pub content: Vec<Content>,

    /// Whether the tool call resulted in an error.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,

    /// Structured content (if the tool defines an outputSchema).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl CallToolResult {
    /// Create a successful result with content.
    pub fn success(content: Vec<Content>) -> Self {
        Self {
            content,
            is_error: false,
            structured_content: None,
        }
    }

    /// Create a successful result with a single text content.
    pub fn text(text: impl Into<String>) -> Self {
        Self::success(vec![Content::text(text)])
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![Content::text(message)],
            is_error: true,
            structured_content: None,
        }
    }

    /// Add structured content.
    pub fn with_structured(mut self, value: Value) -> Self {
        self.structured_content = Some(value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_info_parses_wire_format() {
        let tool: ToolInfo = serde_json::from_value(json!({
            "name": "API-post-search",
            "description": "Search pages",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" }
                },
                "additionalProperties": false
            }
        }))
        .unwrap();

        assert_eq!(tool.name, "API-post-search");
        assert_eq!(tool.description.as_deref(), Some("Search pages"));
        // Schema keywords beyond type/properties survive untouched
        assert_eq!(tool.input_schema["additionalProperties"], json!(false));
    }

    #[test]
    fn test_call_tool_result_success() {
        let result = CallToolResult::text("Hello, World!");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "Hello, World!");
        assert!(json.get("isError").is_none()); // false is skipped
    }

    #[test]
    fn test_call_tool_result_error() {
        let result = CallToolResult::error("Something went wrong");

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["isError"], true);
        assert_eq!(json["content"][0]["text"], "Something went wrong");
    }

    #[test]
    fn test_call_tool_result_missing_content() {
        // Some servers omit content entirely when structuredContent is set
        let result: CallToolResult = serde_json::from_value(json!({
            "structuredContent": { "answer": 42 }
        }))
        .unwrap();

        assert!(result.content.is_empty());
        assert!(!result.is_error);
        assert_eq!(result.structured_content, Some(json!({ "answer": 42 })));
    }
}
