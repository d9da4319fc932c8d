//! Chat input handling shared by the browser page and the terminal chat.
//!
//! A line of the form `/tool <name> [<json args>]` is a tool command; any
//! other text is echoed back.

use serde_json::{json, Value};

use crate::types::CallEnvelope;

const TOOL_COMMAND: &str = "/tool";

/// Shown for a `/tool` command without a tool name.
pub const USAGE: &str = "Usage: /tool <name> [json arguments]";

/// A parsed `/tool` command.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCommand {
    pub tool: String,
    pub arguments: Value,
}

/// What a chat line turned into.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Empty,
    Text(String),
    /// `/tool` with no name.
    Usage,
    Tool(ToolCommand),
}

impl ChatInput {
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if trimmed == TOOL_COMMAND {
            return Self::Usage;
        }
        match parse_tool_command(trimmed) {
            Some(command) => Self::Tool(command),
            None => Self::Text(trimmed.to_string()),
        }
    }
}

/// Parse `/tool <name> [<json args>]`, splitting on any whitespace.
///
/// Arguments that are not valid JSON are wrapped as `{"text": <raw>}`.
/// Returns `None` when the line is not a tool command or names no tool.
#[must_use]
pub fn parse_tool_command(input: &str) -> Option<ToolCommand> {
    let rest = input.trim().strip_prefix(TOOL_COMMAND)?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    if rest.is_empty() {
        return None;
    }

    let (tool, raw_args) = match rest.split_once(char::is_whitespace) {
        Some((tool, raw_args)) => (tool, raw_args.trim()),
        None => (rest, ""),
    };

    let arguments = if raw_args.is_empty() {
        json!({})
    } else {
        serde_json::from_str(raw_args).unwrap_or_else(|_| json!({ "text": raw_args }))
    };

    Some(ToolCommand {
        tool: tool.to_string(),
        arguments,
    })
}

/// Reply shown for plain (non-command) text.
#[must_use]
pub fn echo_reply(text: &str) -> String {
    format!("Echo: {text}")
}

/// Render a call envelope the way the chat shows it.
#[must_use]
pub fn render_envelope(envelope: &CallEnvelope) -> String {
    if envelope.ok {
        let result = envelope.result.clone().unwrap_or(Value::Null);
        let pretty = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());
        format!("Tool result:\n{pretty}")
    } else {
        format!(
            "Tool error: {}",
            envelope.error.as_deref().unwrap_or("unknown")
        )
    }
}
