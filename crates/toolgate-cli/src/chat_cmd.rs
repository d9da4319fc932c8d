use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use toolgate_core::chat::{echo_reply, render_envelope, ChatInput, USAGE};

use crate::client::GatewayClient;

fn prompt() -> anyhow::Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

/// Read chat lines from stdin until EOF or `/quit`.
pub async fn run(client: &GatewayClient) -> anyhow::Result<()> {
    println!("Type /tool <name> [json] to call a tool, /quit to exit.");
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "/quit" {
            break;
        }
        if let Some(reply) = respond(client, &line).await {
            println!("{reply}");
        }
        prompt()?;
    }
    Ok(())
}

/// The chat's answer to one line; blank lines get none.
async fn respond(client: &GatewayClient, line: &str) -> Option<String> {
    let reply = match ChatInput::parse(line) {
        ChatInput::Empty => return None,
        ChatInput::Text(text) => echo_reply(&text),
        ChatInput::Usage => USAGE.to_string(),
        ChatInput::Tool(cmd) => match client.call(&cmd.tool, cmd.arguments).await {
            Ok(envelope) => render_envelope(&envelope),
            Err(e) => format!("Tool error: {e:#}"),
        },
    };
    Some(reply)
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn replies_without_calling_the_server() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.any_request();
                then.status(200).json_body(json!({"ok": true, "result": null}));
            })
            .await;
        let client = GatewayClient::new(&server.base_url());

        assert_eq!(respond(&client, "   ").await, None);
        assert_eq!(respond(&client, "hello").await.as_deref(), Some("Echo: hello"));
        assert_eq!(respond(&client, "/tool").await.as_deref(), Some(USAGE));
        assert_eq!(respond(&client, "/tool \t").await.as_deref(), Some(USAGE));
        mock.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn tool_command_split_on_tab_calls_named_tool() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/call")
                    .json_body(json!({"name": "slack_get_users", "arguments": {"limit": 2}}));
                then.status(200)
                    .json_body(json!({"ok": true, "result": {"members": []}}));
            })
            .await;
        let client = GatewayClient::new(&server.base_url());

        let reply = respond(&client, "/tool slack_get_users\t{\"limit\": 2}").await;
        mock.assert_async().await;
        assert_eq!(reply.as_deref(), Some("Tool result:\n{\n  \"members\": []\n}"));
    }

    #[tokio::test]
    async fn failed_call_renders_tool_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/call");
                then.status(500)
                    .json_body(json!({"ok": false, "error": "SLACK_BOT_TOKEN not set"}));
            })
            .await;
        let client = GatewayClient::new(&server.base_url());

        let reply = respond(&client, "/tool slack_get_users").await;
        assert_eq!(reply.as_deref(), Some("Tool error: SLACK_BOT_TOKEN not set"));
    }
}
