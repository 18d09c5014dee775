//! live-mcp-bridge - MCP tools for live function-calling runtimes
//!
//! Live conversational AI runtimes speak a restricted function-calling
//! dialect: uppercase type tags, string-only enums, no union types, and
//! a strict name alphabet. MCP servers speak full JSON Schema. This
//! crate bridges the two directions:
//!
//! - **Registration**: project each provider tool's schema into the
//!   restricted dialect ([`projector`]), build a reversal plan for its
//!   arguments ([`mapping`]), and register the result under a generated
//!   handler name ([`registry`]).
//! - **Dispatch**: reverse AI-supplied arguments back to provider shape
//!   ([`transform`]), repair known-ambiguous shapes ([`normalizer`]),
//!   call the provider with a deadline, and flatten the result to text.
//!
//! ```no_run
//! use live_mcp_bridge::{BridgeConfig, HandlerRegistry};
//! use live_mcp_bridge::provider::connect_and_register;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let (config, _sources) = BridgeConfig::load()?;
//! let mut registry = HandlerRegistry::from_config(&config);
//! for provider in config.enabled_providers() {
//!     connect_and_register(&mut registry, provider).await?;
//! }
//! // Hand `registry.declarations()` to the runtime session, then:
//! let reply = registry.invoke("notionPostSearch", serde_json::json!({ "query": "hi" })).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod mapping;
pub mod normalizer;
pub mod projector;
pub mod provider;
pub mod registry;
pub mod schema;
pub mod transform;

pub use config::{BridgeConfig, ConfigError, ConfigSources, ProviderConfig};
pub use error::BridgeError;
pub use mapping::{build_mapping, ParameterMapping, TransformKind};
pub use normalizer::{Discriminant, NormalizerSet, PolymorphicRef};
pub use projector::project_schema;
pub use provider::{connect_and_register, McpProvider, ToolProvider};
pub use registry::{
    handler_name, is_legal_handler_name, HandlerRegistry, RegistrationSummary, RegistrySnapshot,
    ToolDescriptor, ToolRepository,
};
pub use schema::{FunctionDeclaration, RestrictedSchema, Type};
pub use transform::transform_arguments;
