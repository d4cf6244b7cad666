//! HTTP surface tests, driven through the router with `oneshot`.

mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use common::*;
use gasless_mcp_server::{api::create_router, config::Config, AppState};

fn app(harness: Harness) -> Router {
    let Harness { dispatcher, .. } = harness;
    create_router(AppState::new(Config::default(), Arc::new(dispatcher)))
}

fn context() -> Value {
    json!({ "signingKey": TEST_KEY, "network": "base", "smartAccountAddress": ACCOUNT })
}

async fn send(app: Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into()));
    (status, value)
}

#[tokio::test]
async fn health_reports_networks_and_tool_count() {
    let (status, body) =
        send(app(Harness::builder().build()), Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["defaultNetwork"], "avalanche");
    assert_eq!(body["tools"], 17);
}

#[tokio::test]
async fn tools_listing_carries_input_schemas() {
    let (status, body) =
        send(app(Harness::builder().build()), Method::GET, "/api/tools", None).await;
    assert_eq!(status, StatusCode::OK);
    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 17);
    let swap = tools.iter().find(|t| t["name"] == "smart_swap").unwrap();
    assert!(swap["inputSchema"]["properties"]["amount"].is_object());
}

#[tokio::test]
async fn tool_call_with_context_succeeds() {
    let (status, body) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/tools/get_address",
        Some(json!({ "arguments": {}, "context": context() })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tool"], "get_address");
    assert_eq!(body["is_error"], false);
    assert!(body["result"].as_str().unwrap().contains("Network: base"));
}

#[tokio::test]
async fn handler_failure_is_a_flagged_result() {
    let harness = Harness::builder()
        .token(addr(USDC_BASE), FakeToken::new("USDC", 6, units(10, 6)))
        .quote_failure("no route")
        .build();
    let (status, body) = send(
        app(harness),
        Method::POST,
        "/api/tools/smart_swap",
        Some(json!({
            "arguments": { "tokenInSymbol": "USDC", "tokenOutSymbol": "WETH", "amount": "1" },
            "context": context(),
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_error"], true);
    assert_eq!(body["result"], "Error creating swap order: swap quote failed: no route");
}

#[tokio::test]
async fn unknown_tool_and_missing_context_are_http_errors() {
    let (status, _) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/tools/launch_rocket",
        Some(json!({ "context": context() })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // the default config carries no signing key
    let (status, body) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/tools/get_address",
        Some(json!({ "arguments": {} })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.as_str().unwrap().contains("Invalid execution context"));
}

#[tokio::test]
async fn rpc_lists_and_calls_tools() {
    let (status, body) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/rpc",
        Some(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 17);

    let (_, body) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/rpc",
        Some(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": {
                "name": "format_units",
                "arguments": { "value": "1500000", "decimals": 6 },
                "context": context(),
            }
        })),
    )
    .await;
    assert_eq!(body["id"], 2);
    assert_eq!(body["result"]["isError"], false);
    assert!(body["result"]["content"][0]["text"].as_str().unwrap().contains("1.5"));

    let (_, body) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/rpc",
        Some(json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "launch_rocket", "arguments": {}, "context": context() }
        })),
    )
    .await;
    assert_eq!(body["result"]["isError"], true);
    assert_eq!(body["result"]["content"][0]["text"], "Error: Unknown tool launch_rocket");

    let (_, body) = send(
        app(Harness::builder().build()),
        Method::POST,
        "/api/rpc",
        Some(json!({ "jsonrpc": "2.0", "id": 4, "method": "resources/list" })),
    )
    .await;
    assert_eq!(body["error"]["code"], -32601);
}
