use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::{error::DispatchError, tools::ExecutionContext, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct CallToolRequest {
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub context: Option<ExecutionContext>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResponse {
    pub tool: String,
    pub result: String,
    pub is_error: bool,
}

pub async fn list_tools_handler(State(state): State<AppState>) -> Json<Value> {
    Json(serde_json::json!({ "tools": state.dispatcher.registry().to_json() }))
}

/// Runs a tool. Handler failures come back as `200` with `is_error` set and
/// the prefixed message; only an unknown tool or an unusable context is an
/// HTTP error.
pub async fn call_tool_handler(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<CallToolRequest>,
) -> Result<Json<CallToolResponse>, (StatusCode, String)> {
    info!("HTTP tool call: {}", name);
    let context = req.context.unwrap_or_default().or(&state.default_context);

    match state.dispatcher.execute(&name, req.arguments, &context).await {
        Ok(result) => Ok(Json(CallToolResponse {
            tool: name,
            result,
            is_error: false,
        })),
        Err(err @ DispatchError::Operation { .. }) => Ok(Json(CallToolResponse {
            tool: name,
            result: err.to_string(),
            is_error: true,
        })),
        Err(err @ DispatchError::UnknownTool(_)) => Err((StatusCode::NOT_FOUND, err.to_string())),
        Err(err @ DispatchError::InvalidContext(_)) => {
            Err((StatusCode::BAD_REQUEST, err.to_string()))
        }
    }
}
