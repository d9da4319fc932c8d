use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde_json::Value;

use toolgate_core::{CallEnvelope, Error, ToolDescriptor};

use crate::app_state::AppState;

const USAGE: &str =
    "body must be JSON with field \"name\": string and optional \"arguments\": object";

/// HTTP status for a failed tool call.
fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::UnknownTool(_) => StatusCode::NOT_FOUND,
        err if err.is_client_error() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// List every registered tool.
pub async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolDescriptor>> {
    Json(state.registry.definitions())
}

/// Call one tool and wrap the outcome in an envelope.
///
/// The body is taken raw so malformed JSON gets an envelope instead of the
/// extractor's plain-text rejection.
pub async fn call_tool(
    State(state): State<AppState>,
    body: Bytes,
) -> (StatusCode, Json<CallEnvelope>) {
    let request: Value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Object(serde_json::Map::new())
    } else {
        match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(CallEnvelope::failure("Invalid JSON body").with_details(e.to_string())),
                )
            }
        }
    };

    let Some(name) = request.get("name").and_then(Value::as_str) else {
        return (StatusCode::BAD_REQUEST, Json(CallEnvelope::failure(USAGE)));
    };
    let arguments = request.get("arguments").cloned().unwrap_or(Value::Null);

    match state.registry.call(name, arguments).await {
        Ok(result) => (StatusCode::OK, Json(CallEnvelope::success(result))),
        Err(err) => (status_for(&err), Json(CallEnvelope::failure(err.to_string()))),
    }
}
