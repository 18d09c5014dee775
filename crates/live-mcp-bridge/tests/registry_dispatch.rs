//! Dispatch behavior against in-process fake providers: deadlines,
//! cancellation, isolation between handlers, and the argument round
//! trip. Time-dependent tests run on a paused clock.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use live_mcp_bridge::{BridgeError, HandlerRegistry, ToolProvider};
use warble::{CallToolResult, ClientError, ToolInfo};

/// Echoes the provider-shaped arguments back as text.
struct EchoProvider;

#[async_trait]
impl ToolProvider for EchoProvider {
    async fn call_tool(
        &self,
        _name: &str,
        arguments: Value,
        _cancel: CancellationToken,
    ) -> Result<CallToolResult, ClientError> {
        Ok(CallToolResult::text(arguments.to_string()))
    }
}

/// Never completes; dispatch must give up on its own.
struct StallProvider;

#[async_trait]
impl ToolProvider for StallProvider {
    async fn call_tool(
        &self,
        _name: &str,
        _arguments: Value,
        _cancel: CancellationToken,
    ) -> Result<CallToolResult, ClientError> {
        std::future::pending::<()>().await;
        Ok(CallToolResult::text("never"))
    }
}

/// Records the arguments it was called with.
#[derive(Default)]
struct CaptureProvider {
    seen: Mutex<Option<(String, Value)>>,
}

#[async_trait]
impl ToolProvider for CaptureProvider {
    async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        _cancel: CancellationToken,
    ) -> Result<CallToolResult, ClientError> {
        *self.seen.lock().unwrap() = Some((name.to_string(), arguments));
        Ok(CallToolResult::text("ok"))
    }
}

struct FailingProvider;

#[async_trait]
impl ToolProvider for FailingProvider {
    async fn call_tool(
        &self,
        _name: &str,
        _arguments: Value,
        _cancel: CancellationToken,
    ) -> Result<CallToolResult, ClientError> {
        Err(ClientError::Transport("connection reset".to_string()))
    }
}

fn tool(name: &str, schema: Value) -> ToolInfo {
    ToolInfo::new(name, schema)
}

fn simple_tool(name: &str) -> ToolInfo {
    tool(
        name,
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } }
        }),
    )
}

#[tokio::test(start_paused = true)]
async fn dispatch_times_out_at_the_default_deadline() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(StallProvider), "notes", &[simple_tool("stall")]);

    let started = tokio::time::Instant::now();
    let err = registry
        .invoke("notesStall", json!({ "query": "hi" }))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BridgeError::DispatchTimeout { timeout_secs: 30, .. }
    ));
    assert!(started.elapsed() >= Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn slow_handlers_do_not_block_healthy_ones() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(StallProvider), "notes", &[simple_tool("stall")]);
    registry.register(Arc::new(EchoProvider), "notes", &[simple_tool("echo")]);
    let registry = Arc::new(registry);

    let stalled = tokio::spawn({
        let registry = registry.clone();
        async move { registry.invoke("notesStall", json!({})).await }
    });

    // The healthy handler answers while the slow one is still pending.
    let healthy = registry.invoke("notesEcho", json!({ "query": "hi" })).await;
    assert!(healthy.is_ok());

    let err = stalled.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::DispatchTimeout { .. }));
}

#[tokio::test(start_paused = true)]
async fn configured_timeout_is_honored() {
    let mut registry = HandlerRegistry::new().with_call_timeout(Duration::from_secs(5));
    registry.register(Arc::new(StallProvider), "notes", &[simple_tool("stall")]);

    let started = tokio::time::Instant::now();
    let err = registry.invoke("notesStall", json!({})).await.unwrap_err();

    assert!(matches!(
        err,
        BridgeError::DispatchTimeout { timeout_secs: 5, .. }
    ));
    assert!(started.elapsed() >= Duration::from_secs(5));
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test]
async fn caller_cancellation_wins_over_the_provider() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(StallProvider), "notes", &[simple_tool("stall")]);

    let token = CancellationToken::new();
    token.cancel();
    let err = registry
        .invoke_with_cancel("notesStall", json!({}), token)
        .await
        .unwrap_err();

    assert!(matches!(err, BridgeError::Cancelled { .. }));
}

#[tokio::test]
async fn cancellation_mid_flight_stops_the_call() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(StallProvider), "notes", &[simple_tool("stall")]);
    let registry = Arc::new(registry);

    let token = CancellationToken::new();
    let invocation = tokio::spawn({
        let registry = registry.clone();
        let token = token.clone();
        async move { registry.invoke_with_cancel("notesStall", json!({}), token).await }
    });

    tokio::task::yield_now().await;
    token.cancel();

    let err = invocation.await.unwrap().unwrap_err();
    assert!(matches!(err, BridgeError::Cancelled { .. }));
}

#[tokio::test]
async fn concurrent_invocations_share_one_registry() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(EchoProvider), "notes", &[simple_tool("echo")]);

    let (a, b) = tokio::join!(
        registry.invoke("notesEcho", json!({ "query": "a" })),
        registry.invoke("notesEcho", json!({ "query": "b" })),
    );
    assert!(a.unwrap().contains("\"a\""));
    assert!(b.unwrap().contains("\"b\""));
}

#[tokio::test]
async fn provider_failures_map_to_provider_call_errors() {
    let mut registry = HandlerRegistry::new();
    registry.register(Arc::new(FailingProvider), "notes", &[simple_tool("flaky")]);

    let err = registry.invoke("notesFlaky", json!({})).await.unwrap_err();
    match err {
        BridgeError::ProviderCall { message, .. } => {
            assert!(message.contains("connection reset"))
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn bad_tools_register_per_tool_not_per_list() {
    let mut registry = HandlerRegistry::new();
    let summary = registry.register(
        Arc::new(EchoProvider),
        "notes",
        &[
            simple_tool("echo"),
            tool("запрос", json!({ "type": "object" })),
            simple_tool("echo"),
        ],
    );

    assert_eq!(summary.registered, vec!["notesEcho".to_string()]);
    assert_eq!(summary.skipped.len(), 2);

    // The surviving handler still dispatches.
    let reply = registry.invoke("notesEcho", json!({ "query": "hi" })).await;
    assert!(reply.is_ok());
}

#[tokio::test]
async fn stringified_enums_arrive_numeric_at_the_provider() {
    let capture = Arc::new(CaptureProvider::default());
    let mut registry = HandlerRegistry::new();
    registry.register(
        capture.clone(),
        "notes",
        &[tool(
            "API-post-search",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string" },
                    "level": { "type": "integer", "enum": [1, 2, 3] }
                }
            }),
        )],
    );

    // The declaration advertises the enum as strings.
    let declarations = registry.declarations();
    let level = &declarations[0].parameters.properties.as_ref().unwrap()["level"];
    assert_eq!(
        level.enum_values,
        Some(vec!["1".to_string(), "2".to_string(), "3".to_string()])
    );

    // A runtime answering in kind arrives numeric at the provider.
    registry
        .invoke("notesPostSearch", json!({ "query": "hi", "level": "2" }))
        .await
        .unwrap();

    let (name, arguments) = capture.seen.lock().unwrap().clone().unwrap();
    assert_eq!(name, "API-post-search");
    assert_eq!(arguments, json!({ "query": "hi", "level": 2 }));
}

#[tokio::test]
async fn parent_references_are_repaired_at_dispatch() {
    let capture = Arc::new(CaptureProvider::default());
    let mut registry = HandlerRegistry::new();
    registry.register(
        capture.clone(),
        "notes",
        &[tool(
            "API-post-page",
            json!({
                "type": "object",
                "properties": {
                    "parent": {
                        "type": "object",
                        "additionalProperties": true,
                        "properties": { "page_id": { "type": "string" } }
                    }
                }
            }),
        )],
    );

    // Null discriminants are stripped; the real one survives untouched.
    registry
        .invoke(
            "notesPostPage",
            json!({ "parent": { "page_id": null, "database_id": "db-1" } }),
        )
        .await
        .unwrap();
    let (_, arguments) = capture.seen.lock().unwrap().clone().unwrap();
    assert_eq!(arguments, json!({ "parent": { "database_id": "db-1" } }));

    // Two discriminants: first in source order wins and gets tagged.
    registry
        .invoke(
            "notesPostPage",
            json!({ "parent": { "page_id": "pg-1", "database_id": "db-1" } }),
        )
        .await
        .unwrap();
    let (_, arguments) = capture.seen.lock().unwrap().clone().unwrap();
    assert_eq!(
        arguments,
        json!({ "parent": { "page_id": "pg-1", "type": "page_id" } })
    );
}

#[tokio::test]
async fn arrays_of_objects_transform_element_wise() {
    let capture = Arc::new(CaptureProvider::default());
    let mut registry = HandlerRegistry::new();
    registry.register(
        capture.clone(),
        "notes",
        &[tool(
            "API-patch-children",
            json!({
                "type": "object",
                "properties": {
                    "children": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "indent": { "type": "integer", "enum": [0, 1, 2] }
                            }
                        }
                    }
                }
            }),
        )],
    );

    registry
        .invoke(
            "notesPatchChildren",
            json!({ "children": [{ "indent": "0" }, { "indent": "2" }] }),
        )
        .await
        .unwrap();

    let (_, arguments) = capture.seen.lock().unwrap().clone().unwrap();
    assert_eq!(
        arguments,
        json!({ "children": [{ "indent": 0 }, { "indent": 2 }] })
    );
}
