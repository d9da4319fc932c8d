use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use toolgate_core::{GatewayConfig, IntegrationKind};
use toolgate_mcp::ToolRegistry;
use toolgate_server::app_state::AppState;
use toolgate_server::handlers::SESSION_HEADER;

use mock_tools::MockTools;

fn build_test_app() -> (TestServer, MockTools) {
    let mocks = MockTools::new();
    let registry = ToolRegistry::new(mocks.tools.clone()).unwrap();
    let app = toolgate_server::router::create_router(AppState::new(registry));
    (TestServer::new(app).unwrap(), mocks)
}

fn session_header() -> HeaderName {
    HeaderName::from_static(SESSION_HEADER)
}

#[tokio::test]
async fn health_check() {
    let (server, mocks) = build_test_app();
    let resp = server.get("/health").await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["tools"], mocks.tools.len());
    assert_eq!(body["integrations"], json!([]));
}

#[tokio::test]
async fn health_reports_configured_integrations() {
    let mut config = GatewayConfig {
        enabled: vec![IntegrationKind::Slack, IntegrationKind::Gmail],
        ..GatewayConfig::default()
    };
    config.slack.bot_token = Some("xoxb-h".to_string());

    let registry = ToolRegistry::new(toolgate_integrations::build_tools(&config).unwrap()).unwrap();
    let state = AppState::new(registry).with_integrations(&config);
    let server = TestServer::new(toolgate_server::router::create_router(state)).unwrap();

    let body: Value = server.get("/health").await.json();
    assert_eq!(body["tools"], 15);
    assert_eq!(
        body["integrations"],
        json!([
            {"name": "slack", "configured": true},
            {"name": "gmail", "configured": false}
        ])
    );
}

#[tokio::test]
async fn chat_page_is_served() {
    let (server, _) = build_test_app();
    let resp = server.get("/").await;
    resp.assert_status_ok();
    assert!(resp.text().contains("/tool"));
}

#[tokio::test]
async fn tools_are_listed_once_with_schema() {
    let (server, mocks) = build_test_app();
    let resp = server.get("/tools").await;
    resp.assert_status_ok();

    let tools: Vec<Value> = resp.json();
    assert_eq!(tools.len(), mocks.tools.len());
    for tool in &mocks.tools {
        let listed: Vec<&Value> = tools.iter().filter(|t| t["name"] == tool.name()).collect();
        assert_eq!(listed.len(), 1, "{} listed once", tool.name());
        assert_eq!(listed[0]["description"], tool.descriptor.description.as_str());
        assert!(listed[0]["inputSchema"].is_object());
    }
}

#[tokio::test]
async fn call_returns_success_envelope() {
    let (server, mocks) = build_test_app();
    let resp = server
        .post("/call")
        .json(&json!({
            "name": "mock_echo",
            "arguments": {"text": "hi", "descope_session_id": "sess-1"}
        }))
        .await;

    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(
        body,
        json!({"ok": true, "result": {"echo": "hi", "session": "sess-1"}})
    );
    assert_eq!(mocks.echo_calls(), 1);
}

#[tokio::test]
async fn unknown_tool_is_404() {
    let (server, _) = build_test_app();
    let resp = server
        .post("/call")
        .json(&json!({"name": "no_such_tool", "arguments": {}}))
        .await;

    resp.assert_status(StatusCode::NOT_FOUND);
    let body: Value = resp.json();
    assert_eq!(body, json!({"ok": false, "error": "Unknown tool: no_such_tool"}));
}

#[tokio::test]
async fn missing_argument_is_400_without_calling_handler() {
    let (server, mocks) = build_test_app();
    let resp = server
        .post("/call")
        .json(&json!({"name": "mock_echo", "arguments": {"text": ""}}))
        .await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Missing required argument: text");
    assert_eq!(mocks.echo_calls(), 0);
}

#[tokio::test]
async fn non_object_arguments_are_400() {
    let (server, _) = build_test_app();
    let resp = server
        .post("/call")
        .json(&json!({"name": "mock_echo", "arguments": [1, 2]}))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn invalid_json_body_is_400_with_details() {
    let (server, _) = build_test_app();
    let resp = server.post("/call").text("{not json").await;

    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["ok"], false);
    assert_eq!(body["error"], "Invalid JSON body");
    assert!(body["details"].is_string());
}

#[tokio::test]
async fn missing_name_is_400_with_usage() {
    let (server, _) = build_test_app();
    for body in [json!({"arguments": {}}), json!({"name": 42})] {
        let resp = server.post("/call").json(&body).await;
        resp.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = resp.json();
        assert!(body["error"].as_str().unwrap().contains("\"name\""));
    }
}

#[tokio::test]
async fn upstream_and_config_failures_are_500() {
    let (server, _) = build_test_app();

    let resp = server.post("/call").json(&json!({"name": "mock_fail"})).await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json();
    assert_eq!(body, json!({"ok": false, "error": "Mock API error: rate_limited"}));

    let resp = server
        .post("/call")
        .json(&json!({"name": "mock_unconfigured"}))
        .await;
    resp.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = resp.json();
    assert_eq!(body["error"], "MOCK_TOKEN not set");
}

#[tokio::test]
async fn mcp_initialize_opens_session() {
    let (server, _) = build_test_app();
    let resp = server
        .post("/mcp")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": {"protocolVersion": "2025-03-26"}
        }))
        .await;

    resp.assert_status_ok();
    let session_id = resp
        .headers()
        .get(SESSION_HEADER)
        .expect("session header")
        .to_str()
        .unwrap()
        .to_string();
    let body: Value = resp.json();
    assert_eq!(body["result"]["protocolVersion"], "2025-03-26");

    let resp = server
        .post("/mcp")
        .add_header(session_header(), HeaderValue::from_str(&session_id).unwrap())
        .json(&json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await;
    resp.assert_status_ok();
    let body: Value = resp.json();
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 3);

    server
        .delete("/mcp")
        .add_header(session_header(), HeaderValue::from_str(&session_id).unwrap())
        .await
        .assert_status(StatusCode::NO_CONTENT);

    server
        .post("/mcp")
        .add_header(session_header(), HeaderValue::from_str(&session_id).unwrap())
        .json(&json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn mcp_notification_is_accepted() {
    let (server, _) = build_test_app();
    server
        .post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await
        .assert_status(StatusCode::ACCEPTED);
}

#[tokio::test]
async fn mcp_tool_call_wraps_result() {
    let (server, _) = build_test_app();
    let resp = server
        .post("/mcp")
        .json(&json!({
            "jsonrpc": "2.0",
            "id": "c1",
            "method": "tools/call",
            "params": {"name": "mock_echo", "arguments": {"text": "yo"}}
        }))
        .await;

    resp.assert_status_ok();
    let body: Value = resp.json();
    let text = body["result"]["content"][0]["text"].as_str().unwrap();
    let inner: Value = serde_json::from_str(text).unwrap();
    assert_eq!(inner["echo"], "yo");
}

#[tokio::test]
async fn mcp_parse_error() {
    let (server, _) = build_test_app();
    let resp = server.post("/mcp").text("{").await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);
}

#[tokio::test]
async fn mcp_message_without_method_is_invalid_request() {
    let (server, _) = build_test_app();
    let resp = server
        .post("/mcp")
        .json(&json!({"jsonrpc": "2.0", "id": 5, "params": {}}))
        .await;
    resp.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = resp.json();
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 5);
}

#[tokio::test]
async fn slack_call_end_to_end() {
    use httpmock::prelude::*;

    let slack = MockServer::start_async().await;
    let mock = slack
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat.postMessage")
                .header("authorization", "Bearer xoxb-e2e")
                .json_body(json!({"channel": "C42", "text": "deployed"}));
            then.status(200)
                .json_body(json!({"ok": true, "channel": "C42", "ts": "1.0"}));
        })
        .await;

    let mut config = GatewayConfig {
        enabled: vec![IntegrationKind::Slack],
        ..GatewayConfig::default()
    };
    config.slack.bot_token = Some("xoxb-e2e".to_string());
    config.slack.api_base = slack.base_url();

    let registry = ToolRegistry::new(toolgate_integrations::build_tools(&config).unwrap()).unwrap();
    let server =
        TestServer::new(toolgate_server::router::create_router(AppState::new(registry))).unwrap();

    let resp = server
        .post("/call")
        .json(&json!({
            "name": "slack_post_message",
            "arguments": {"channel_id": "C42", "text": "deployed"}
        }))
        .await;

    resp.assert_status_ok();
    mock.assert_async().await;
    let body: Value = resp.json();
    assert_eq!(body["result"]["ts"], "1.0");
}
