//! Bridge error taxonomy.

use thiserror::Error;

/// Errors surfaced by registration and dispatch.
///
/// Registration errors are per-tool: a bad tool is skipped and its
/// siblings still register. Dispatch errors are per-invocation.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Tool could not be registered (illegal generated name, collision).
    #[error("registration of tool '{tool}' failed: {reason}")]
    Registration { tool: String, reason: String },

    /// Provider call exceeded the dispatch deadline.
    #[error("handler '{handler}' timed out after {timeout_secs}s")]
    DispatchTimeout { handler: String, timeout_secs: u64 },

    /// Provider returned an error, or the transport failed mid-call.
    #[error("handler '{handler}' failed: {message}")]
    ProviderCall { handler: String, message: String },

    /// Provider result carried nothing a caller could use.
    #[error("handler '{handler}' returned no usable content")]
    MalformedResponse { handler: String },

    /// No handler registered under this name.
    #[error("unknown handler '{handler}'")]
    UnknownHandler { handler: String },

    /// Invocation was cancelled by the caller before completion.
    #[error("invocation of handler '{handler}' was cancelled")]
    Cancelled { handler: String },
}
