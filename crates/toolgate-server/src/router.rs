use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::app_state::AppState;
use crate::handlers;

/// Create the main application router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Chat page
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        // Gateway endpoints
        .route("/tools", get(handlers::list_tools))
        .route("/call", post(handlers::call_tool))
        // MCP over HTTP
        .route("/mcp", post(handlers::mcp_request).delete(handlers::mcp_delete))
        // Browser clients read Mcp-Session-Id, so headers are exposed too
        .layer(CorsLayer::permissive())
        .with_state(state)
}
