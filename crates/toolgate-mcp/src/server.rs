use std::sync::Arc;

use serde_json::{json, Value};

use crate::jsonrpc::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND};
use crate::{JsonRpcRequest, JsonRpcResponse, ToolRegistry};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "toolgate";

/// JSON-RPC method handling shared by the stdio and HTTP front ends.
#[derive(Clone)]
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    #[must_use]
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one request. Notifications yield `None`.
    pub async fn handle(&self, req: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if req.is_notification() {
            tracing::debug!("Received MCP notification: {}", req.method);
            return None;
        }

        if req.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::error(
                req.id,
                INVALID_REQUEST,
                "jsonrpc must be \"2.0\"",
            ));
        }

        let response = match req.method.as_str() {
            "initialize" => handle_initialize(&req),
            "ping" => JsonRpcResponse::success(req.id.clone(), json!({})),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            _ => JsonRpcResponse::error(req.id.clone(), METHOD_NOT_FOUND, "Method not found"),
        };
        Some(response)
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let tools = self.registry.definitions();
        JsonRpcResponse::success(req.id.clone(), json!({ "tools": tools }))
    }

    async fn handle_tools_call(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let Some(params) = &req.params else {
            return JsonRpcResponse::error(req.id.clone(), INVALID_PARAMS, "Missing params");
        };

        let Some(tool_name) = params.get("name").and_then(Value::as_str) else {
            return JsonRpcResponse::error(
                req.id.clone(),
                INVALID_PARAMS,
                "Missing 'name' parameter",
            );
        };

        let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);

        match self.registry.call(tool_name, arguments).await {
            Ok(value) => JsonRpcResponse::success(
                req.id.clone(),
                json!({
                    "content": [{
                        "type": "text",
                        "text": serde_json::to_string_pretty(&value).unwrap_or_default()
                    }]
                }),
            ),
            Err(err) => JsonRpcResponse::success(
                req.id.clone(),
                json!({
                    "content": [{
                        "type": "text",
                        "text": json!({ "error": err.to_string() }).to_string()
                    }],
                    "isError": true
                }),
            ),
        }
    }
}

fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
    let protocol_version = req
        .params
        .as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_PROTOCOL_VERSION);

    JsonRpcResponse::success(
        req.id.clone(),
        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": {}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        }),
    )
}
