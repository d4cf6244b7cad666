//! # MCP Handler Module
//!
//! Implements the Model Context Protocol surface of the server:
//!
//! - `initialize` - server info and capabilities
//! - `tools/list` - every registered tool with its input schema
//! - `tools/call` - run one tool through the [`Dispatcher`]
//!
//! Tool failures are returned as successful results flagged `isError`, so an
//! assistant can read the reason and carry on. Only protocol problems
//! (unknown method, malformed params) become JSON-RPC errors.

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::{
    mcp::protocol::{error_codes, Request, Response, ToolCallParams},
    AppState,
};

// Helper: produce a result Value that always contains a text content array.
fn make_texty_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "tools/list" => handle_tools_list(&req, &state),
        "tools/call" => handle_tool_call(req, state).await,
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the tool registry.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params: ToolCallParams = match req.params.clone().map(serde_json::from_value) {
        Some(Ok(params)) => params,
        Some(Err(e)) => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                format!("Invalid tools/call params: {}", e),
            )
        }
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let context = params
        .context
        .unwrap_or_default()
        .or(&state.default_context);

    let result = match state
        .dispatcher
        .execute(&params.name, params.arguments, &context)
        .await
    {
        Ok(text) => make_texty_result(text, false),
        Err(err) => {
            if err.operation().is_none() {
                warn!("tools/call {} rejected: {}", params.name, err);
            }
            make_texty_result(err.to_string(), true)
        }
    };

    Response::success(req.id, result)
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "gasless_mcp",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions =
        "Gasless smart-account MCP server: balances, transfers, swaps, approvals and contract calls, all sponsored.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": "2025-06-18",
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request from the live registry.
fn handle_tools_list(req: &Request, state: &AppState) -> Response {
    let tools = state.dispatcher.registry().to_json();
    Response::success(req.id.clone(), json!({ "tools": tools }))
}
