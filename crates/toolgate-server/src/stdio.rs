//! Newline-delimited JSON-RPC over stdin/stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_stream::{wrappers::LinesStream, StreamExt};

use toolgate_mcp::{JsonRpcRequest, McpServer};

/// Serve requests from `reader` until EOF, writing one response per line.
///
/// Stdout carries protocol traffic only; logging goes to stderr.
///
/// # Errors
///
/// Returns an I/O error if reading or writing fails.
pub async fn serve<R, W>(server: &McpServer, reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = LinesStream::new(reader.lines());

    while let Some(line) = lines.next().await {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let response = match JsonRpcRequest::parse(line.as_bytes()) {
            Ok(req) => server.handle(req).await,
            Err(rejected) => {
                tracing::warn!(code = ?rejected.error_code(), "rejected JSON-RPC line");
                Some(rejected)
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_vec(&response)?;
            out.push(b'\n');
            writer.write_all(&out).await?;
            writer.flush().await?;
        }
    }

    tracing::info!("stdin closed, stopping MCP stdio server");
    Ok(())
}

/// Serve on the process's stdin and stdout.
///
/// # Errors
///
/// Returns an I/O error if reading or writing fails.
pub async fn serve_stdio(server: &McpServer) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(server, stdin, tokio::io::stdout()).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{json, Value};
    use toolgate_mcp::jsonrpc::{INVALID_REQUEST, PARSE_ERROR};
    use toolgate_mcp::ToolRegistry;

    use super::*;

    async fn run(input: &str) -> Vec<Value> {
        let server = McpServer::new(Arc::new(ToolRegistry::default()));
        let mut out = Vec::new();
        serve(&server, input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn one_response_per_request() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
        ))
        .await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "toolgate");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"], json!({"tools": []}));
    }

    #[tokio::test]
    async fn garbage_yields_parse_error_with_null_id() {
        let responses = run("not json\n").await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
    }

    #[tokio::test]
    async fn valid_json_without_method_is_invalid_request() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":9,"params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":10,"method":"ping"}"#,
            "\n",
        ))
        .await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 9);
        assert_eq!(responses[0]["error"]["code"], INVALID_REQUEST);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[tokio::test]
    async fn unknown_tool_is_error_content() {
        let responses = run(concat!(
            r#"{"jsonrpc":"2.0","id":"a","method":"tools/call","params":{"name":"nope"}}"#,
            "\n"
        ))
        .await;
        let result = &responses[0]["result"];
        assert_eq!(result["isError"], true);
        assert!(result["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown tool: nope"));
    }
}
