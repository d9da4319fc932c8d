use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::app_state::AppState;

/// Liveness plus a summary of what the gateway can serve.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "tools": state.registry.len(),
        "integrations": state.integrations.as_slice(),
    }))
}
