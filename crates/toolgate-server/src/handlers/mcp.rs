use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use toolgate_mcp::jsonrpc::INVALID_REQUEST;
use toolgate_mcp::{JsonRpcRequest, JsonRpcResponse};

use crate::app_state::AppState;

pub const SESSION_HEADER: &str = "mcp-session-id";

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// Handle one JSON-RPC message over HTTP.
///
/// A successful `initialize` without a session header opens a session and
/// returns its id in `Mcp-Session-Id`. Requests naming an unknown session get
/// 404; notifications are acknowledged with 202 and no body.
pub async fn mcp_request(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let req = match JsonRpcRequest::parse(&body) {
        Ok(req) => req,
        Err(rejected) => return (StatusCode::BAD_REQUEST, Json(rejected)).into_response(),
    };

    let session = session_id(&headers);
    if let Some(id) = session {
        if !state.sessions.touch(id).await {
            return (
                StatusCode::NOT_FOUND,
                Json(JsonRpcResponse::error(req.id, INVALID_REQUEST, "Session not found")),
            )
                .into_response();
        }
    }

    let is_initialize = req.method == "initialize";
    let Some(response) = state.mcp.handle(req).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    if is_initialize && session.is_none() && response.error_code().is_none() {
        let id = state.sessions.create().await;
        return ([(SESSION_HEADER, id)], Json(response)).into_response();
    }
    Json(response).into_response()
}

/// End the session named in `Mcp-Session-Id`.
pub async fn mcp_delete(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    match session_id(&headers) {
        None => StatusCode::BAD_REQUEST,
        Some(id) if state.sessions.remove(id).await => StatusCode::NO_CONTENT,
        Some(_) => StatusCode::NOT_FOUND,
    }
}
