use std::sync::Arc;

use serde_json::{json, Value};
use toolgate_core::GatewayConfig;
use toolgate_mcp::{McpServer, ToolRegistry};

use crate::session::SessionManager;

/// Shared application state with injected dependencies.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ToolRegistry>,
    pub mcp: McpServer,
    pub sessions: Arc<SessionManager>,
    /// Per-integration `{name, configured}` entries reported by `/health`.
    pub integrations: Arc<Vec<Value>>,
}

impl AppState {
    #[must_use]
    pub fn new(registry: ToolRegistry) -> Self {
        let registry = Arc::new(registry);
        Self {
            mcp: McpServer::new(Arc::clone(&registry)),
            registry,
            sessions: Arc::new(SessionManager::new()),
            integrations: Arc::new(Vec::new()),
        }
    }

    /// Record which enabled integrations have credentials.
    #[must_use]
    pub fn with_integrations(mut self, config: &GatewayConfig) -> Self {
        self.integrations = Arc::new(
            config
                .enabled
                .iter()
                .map(|&kind| json!({ "name": kind.as_str(), "configured": config.is_configured(kind) }))
                .collect(),
        );
        self
    }
}
