//! # API Module
//!
//! HTTP surface of the server, mounted under `/api`.
//!
//! ## Available Endpoints
//!
//! - `GET /health` - liveness plus configured networks
//! - `GET /tools` - registered tools and their schemas
//! - `POST /tools/:name` - run one tool; body `{ "arguments": {..}, "context": {..} }`
//! - `POST /rpc` - MCP JSON-RPC over HTTP

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub mod health;
pub mod rpc;
pub mod tools;

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let api_router = Router::new()
        .route("/health", get(health::health_handler))
        .route("/tools", get(tools::list_tools_handler))
        .route("/tools/:name", post(tools::call_tool_handler))
        // JSON-RPC endpoint for MCP tool calls
        .route("/rpc", post(rpc::rpc_handler));

    Router::new()
        .nest("/api", api_router)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
