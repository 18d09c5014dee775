//! Handler registration and dispatch.
//!
//! Registration projects each provider tool into a declaration the AI
//! runtime accepts, builds its reversal plan, and records the route back
//! to the provider. Dispatch looks the handler up, reverses the
//! arguments, races the provider call against the deadline, and flattens
//! the result into text.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use warble::{CallToolResult, ToolInfo};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::mapping::{build_mapping, ParameterMapping};
use crate::normalizer::NormalizerSet;
use crate::projector::project_schema;
use crate::provider::ToolProvider;
use crate::schema::FunctionDeclaration;
use crate::transform::transform_arguments;

const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable record of one registered tool.
#[derive(Clone)]
pub struct ToolDescriptor {
    pub provider_name: String,
    pub original_tool_name: String,
    pub original_schema: Value,
    pub description: Option<String>,
    pub registered_at: DateTime<Utc>,
}

struct Route {
    descriptor: ToolDescriptor,
    provider: Arc<dyn ToolProvider>,
}

/// Backing store for registered handlers: three maps keyed by handler
/// name, written only during registration and read-only afterwards.
#[derive(Default)]
pub struct ToolRepository {
    declarations: BTreeMap<String, FunctionDeclaration>,
    mappings: BTreeMap<String, ParameterMapping>,
    routes: BTreeMap<String, Route>,
}

impl ToolRepository {
    fn insert(
        &mut self,
        handler: String,
        declaration: FunctionDeclaration,
        mapping: ParameterMapping,
        route: Route,
    ) {
        // All three maps carry the same key set.
        self.declarations.insert(handler.clone(), declaration);
        self.mappings.insert(handler.clone(), mapping);
        self.routes.insert(handler, route);
    }

    fn contains(&self, handler: &str) -> bool {
        self.routes.contains_key(handler)
    }

    fn lookup(&self, handler: &str) -> Option<(&ParameterMapping, &Route)> {
        Some((self.mappings.get(handler)?, self.routes.get(handler)?))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn handler_names(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

/// Outcome of registering one provider's tool list.
#[derive(Debug, Clone, Default)]
pub struct RegistrationSummary {
    /// Handler names registered, in tool-list order.
    pub registered: Vec<String>,
    pub skipped: Vec<SkippedTool>,
}

#[derive(Debug, Clone)]
pub struct SkippedTool {
    pub tool: String,
    pub reason: String,
}

/// Diagnostic snapshot of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySnapshot {
    pub handler_count: usize,
    pub providers: Vec<String>,
    pub handlers: Vec<String>,
    pub bindings: Vec<HandlerBinding>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HandlerBinding {
    pub handler: String,
    pub provider: String,
    pub original_tool: String,
    pub registered_at: DateTime<Utc>,
}

/// Registry of live handlers: the bridge's registration and dispatch
/// surface.
pub struct HandlerRegistry {
    repo: ToolRepository,
    normalizers: NormalizerSet,
    call_timeout: Duration,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            repo: ToolRepository::default(),
            normalizers: NormalizerSet::default(),
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn from_config(config: &BridgeConfig) -> Self {
        Self::new()
            .with_normalizers(config.normalizer_set())
            .with_call_timeout(config.call_timeout())
    }

    pub fn with_normalizers(mut self, normalizers: NormalizerSet) -> Self {
        self.normalizers = normalizers;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Register every tool in `tools` under `provider_name`. A tool that
    /// fails to register is skipped and logged; its siblings are
    /// unaffected.
    pub fn register(
        &mut self,
        provider: Arc<dyn ToolProvider>,
        provider_name: &str,
        tools: &[ToolInfo],
    ) -> RegistrationSummary {
        let mut summary = RegistrationSummary::default();
        for tool in tools {
            match self.register_tool(provider.clone(), provider_name, tool) {
                Ok(handler) => {
                    tracing::info!(
                        provider = provider_name,
                        tool = %tool.name,
                        handler = %handler,
                        "registered handler"
                    );
                    summary.registered.push(handler);
                }
                Err(error) => {
                    tracing::warn!(
                        provider = provider_name,
                        tool = %tool.name,
                        error = %error,
                        "skipping tool"
                    );
                    summary.skipped.push(SkippedTool {
                        tool: tool.name.clone(),
                        reason: error.to_string(),
                    });
                }
            }
        }
        summary
    }

    /// Register a single tool, returning its handler name.
    pub fn register_tool(
        &mut self,
        provider: Arc<dyn ToolProvider>,
        provider_name: &str,
        tool: &ToolInfo,
    ) -> Result<String, BridgeError> {
        let handler = handler_name(provider_name, &tool.name);
        if !is_legal_handler_name(&handler) {
            return Err(BridgeError::Registration {
                tool: tool.name.clone(),
                reason: format!("generated name '{handler}' is not legal for the dialect"),
            });
        }
        if self.repo.contains(&handler) {
            return Err(BridgeError::Registration {
                tool: tool.name.clone(),
                reason: format!("handler name '{handler}' is already registered"),
            });
        }

        let parameters = project_schema(&tool.input_schema, &self.normalizers);
        let mapping = build_mapping(&tool.input_schema);
        let declaration = FunctionDeclaration {
            name: handler.clone(),
            description: tool.description.clone(),
            parameters,
        };
        let descriptor = ToolDescriptor {
            provider_name: provider_name.to_string(),
            original_tool_name: tool.name.clone(),
            original_schema: tool.input_schema.clone(),
            description: tool.description.clone(),
            registered_at: Utc::now(),
        };

        self.repo
            .insert(handler.clone(), declaration, mapping, Route { descriptor, provider });
        Ok(handler)
    }

    /// Declarations for every registered handler, ordered by name.
    pub fn declarations(&self) -> Vec<FunctionDeclaration> {
        self.repo.declarations.values().cloned().collect()
    }

    pub fn descriptor(&self, handler: &str) -> Option<&ToolDescriptor> {
        self.repo.routes.get(handler).map(|route| &route.descriptor)
    }

    pub fn repository(&self) -> &ToolRepository {
        &self.repo
    }

    /// Dispatch one invocation.
    pub async fn invoke(&self, handler: &str, args: Value) -> Result<String, BridgeError> {
        self.invoke_with_cancel(handler, args, CancellationToken::new())
            .await
    }

    /// Dispatch one invocation with caller-controlled cancellation.
    ///
    /// The provider call races the deadline and the caller's token; on
    /// either, the in-flight call is cancelled cooperatively.
    #[tracing::instrument(
        skip(self, args, cancel),
        fields(handler = %handler, call.id = %uuid::Uuid::new_v4())
    )]
    pub async fn invoke_with_cancel(
        &self,
        handler: &str,
        args: Value,
        cancel: CancellationToken,
    ) -> Result<String, BridgeError> {
        let (mapping, route) = self
            .repo
            .lookup(handler)
            .ok_or_else(|| BridgeError::UnknownHandler {
                handler: handler.to_string(),
            })?;

        let provider_args = match args {
            Value::Object(ref object) => {
                transform_arguments(object, mapping, &self.normalizers)
            }
            Value::Null => Map::new(),
            _ => {
                tracing::warn!("arguments were not an object; dispatching with empty arguments");
                Map::new()
            }
        };

        let call_token = cancel.child_token();
        let call = route.provider.call_tool(
            &route.descriptor.original_tool_name,
            Value::Object(provider_args),
            call_token.clone(),
        );

        let result = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(BridgeError::Cancelled {
                    handler: handler.to_string(),
                });
            }
            outcome = tokio::time::timeout(self.call_timeout, call) => match outcome {
                Err(_) => {
                    call_token.cancel();
                    tracing::warn!(timeout_secs = self.call_timeout.as_secs(), "dispatch timed out");
                    return Err(BridgeError::DispatchTimeout {
                        handler: handler.to_string(),
                        timeout_secs: self.call_timeout.as_secs(),
                    });
                }
                Ok(Err(error)) => {
                    return Err(BridgeError::ProviderCall {
                        handler: handler.to_string(),
                        message: error.to_string(),
                    });
                }
                Ok(Ok(result)) => result,
            },
        };

        format_result(handler, result)
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        let providers: BTreeSet<String> = self
            .repo
            .routes
            .values()
            .map(|route| route.descriptor.provider_name.clone())
            .collect();
        let bindings = self
            .repo
            .routes
            .iter()
            .map(|(handler, route)| HandlerBinding {
                handler: handler.clone(),
                provider: route.descriptor.provider_name.clone(),
                original_tool: route.descriptor.original_tool_name.clone(),
                registered_at: route.descriptor.registered_at,
            })
            .collect();

        RegistrySnapshot {
            handler_count: self.repo.len(),
            providers: providers.into_iter().collect(),
            handlers: self.repo.handler_names().map(str::to_string).collect(),
            bindings,
        }
    }
}

/// Flatten a provider result into the text the AI runtime consumes.
///
/// Text blocks win and are joined with newlines; otherwise structured
/// content, then any remaining content blocks, are stringified. An empty
/// result is malformed.
fn format_result(handler: &str, result: CallToolResult) -> Result<String, BridgeError> {
    let text_blocks: Vec<&str> = result
        .content
        .iter()
        .filter_map(|block| block.as_text())
        .collect();

    if result.is_error {
        let message = if text_blocks.is_empty() {
            result
                .structured_content
                .as_ref()
                .map(Value::to_string)
                .unwrap_or_else(|| "tool reported an error without detail".to_string())
        } else {
            text_blocks.join("\n")
        };
        return Err(BridgeError::ProviderCall {
            handler: handler.to_string(),
            message,
        });
    }

    if !text_blocks.is_empty() {
        return Ok(text_blocks.join("\n"));
    }
    if let Some(structured) = &result.structured_content {
        return Ok(structured.to_string());
    }
    if !result.content.is_empty() {
        return serde_json::to_string(&result.content).map_err(|_| {
            BridgeError::MalformedResponse {
                handler: handler.to_string(),
            }
        });
    }

    Err(BridgeError::MalformedResponse {
        handler: handler.to_string(),
    })
}

/// Build a handler name from provider and tool names: camelCase, with
/// the MCP `API-` prefix convention stripped from the tool part.
///
/// `("notion", "API-post-search")` becomes `notionPostSearch`.
pub fn handler_name(provider_name: &str, tool_name: &str) -> String {
    let tool = tool_name.strip_prefix("API-").unwrap_or(tool_name);
    let mut name = camelize(provider_name, false);
    name.push_str(&camelize(tool, true));
    name
}

/// Check a name against the dialect's pattern:
/// `^[A-Za-z_][A-Za-z0-9_.-]{0,63}$`.
pub fn is_legal_handler_name(name: &str) -> bool {
    let bytes = name.as_bytes();
    if bytes.is_empty() || bytes.len() > 64 {
        return false;
    }
    if !(bytes[0].is_ascii_alphabetic() || bytes[0] == b'_') {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b == b'-')
}

fn camelize(input: &str, capitalize_first: bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut first = true;
    for chunk in input.split(['-', '_', '.', ' ']) {
        for segment in split_case_boundaries(chunk) {
            if first && !capitalize_first {
                out.push_str(&segment.to_lowercase());
            } else {
                out.push_str(&capitalize(&segment));
            }
            first = false;
        }
    }
    out
}

/// Split a chunk at lower-to-upper case boundaries: `postSearch`
/// becomes `post`, `Search`.
fn split_case_boundaries(chunk: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;
    for c in chunk.chars() {
        if c.is_uppercase() && previous_lower && !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }
        previous_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn capitalize(segment: &str) -> String {
    let mut chars = segment.chars();
    match chars.next() {
        Some(head) => head.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
