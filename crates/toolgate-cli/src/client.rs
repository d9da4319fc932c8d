use anyhow::Context;
use reqwest::Client;
use serde_json::Value;

use toolgate_core::{CallEnvelope, ToolCallRequest, ToolDescriptor};

/// Thin HTTP client for a running toolgate server.
pub struct GatewayClient {
    http: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_tools(&self) -> anyhow::Result<Vec<ToolDescriptor>> {
        let resp = self
            .http
            .get(format!("{}/tools", self.base_url))
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base_url))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await?;
            anyhow::bail!("Failed to list tools ({status}): {body}");
        }
        Ok(resp.json().await?)
    }

    /// Call a tool. Error statuses still carry an envelope, which is
    /// returned as-is.
    pub async fn call(&self, name: &str, arguments: Value) -> anyhow::Result<CallEnvelope> {
        let resp = self
            .http
            .post(format!("{}/call", self.base_url))
            .json(&ToolCallRequest {
                name: name.to_string(),
                arguments,
            })
            .send()
            .await
            .with_context(|| format!("failed to reach {}", self.base_url))?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(%status, tool = name, "call finished");
        serde_json::from_str(&body)
            .with_context(|| format!("unexpected response ({status}): {body}"))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn call_posts_name_and_arguments() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/call")
                    .json_body(json!({"name": "slack_get_users", "arguments": {"limit": 5}}));
                then.status(200)
                    .json_body(json!({"ok": true, "result": {"members": []}}));
            })
            .await;

        let envelope = GatewayClient::new(&server.base_url())
            .call("slack_get_users", json!({"limit": 5}))
            .await
            .unwrap();
        mock.assert_async().await;
        assert!(envelope.ok);
        assert_eq!(envelope.result, Some(json!({"members": []})));
    }

    #[tokio::test]
    async fn error_status_still_yields_envelope() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/call");
                then.status(404)
                    .json_body(json!({"ok": false, "error": "Unknown tool: nope"}));
            })
            .await;

        let envelope = GatewayClient::new(&server.base_url())
            .call("nope", json!({}))
            .await
            .unwrap();
        assert!(!envelope.ok);
        assert_eq!(envelope.error.as_deref(), Some("Unknown tool: nope"));
    }

    #[tokio::test]
    async fn list_tools_decodes_descriptors() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/tools");
                then.status(200).json_body(json!([
                    {"name": "a", "description": "A", "inputSchema": {"type": "object"}}
                ]));
            })
            .await;

        let tools = GatewayClient::new(&format!("{}/", server.base_url()))
            .list_tools()
            .await
            .unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "a");
    }
}
