use anyhow::Context;
use serde_json::{json, Value};

use crate::client::GatewayClient;

pub async fn list_tools(client: &GatewayClient) -> anyhow::Result<()> {
    let tools = client.list_tools().await?;

    if tools.is_empty() {
        println!("No tools available.");
        return Ok(());
    }

    for tool in &tools {
        println!("{:<36} {}", tool.name, tool.description);
    }
    Ok(())
}

/// Call a tool and print the envelope. Returns the envelope's `ok` flag.
pub async fn call(client: &GatewayClient, name: &str, raw: Option<&str>) -> anyhow::Result<bool> {
    let arguments = parse_arguments(raw)?;
    let envelope = client.call(name, arguments).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(envelope.ok)
}

fn parse_arguments(raw: Option<&str>) -> anyhow::Result<Value> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(json!({}));
    };
    let value: Value = serde_json::from_str(raw).context("arguments must be valid JSON")?;
    if !value.is_object() {
        anyhow::bail!("arguments must be a JSON object");
    }
    Ok(value)
}
