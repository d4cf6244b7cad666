use axum::{extract::State, response::IntoResponse, Json};

use crate::AppState;

pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "networks": state.config.supported_networks(),
        "defaultNetwork": state.config.default_network,
        "tools": state.dispatcher.registry().len(),
    }))
}
