use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Argument key selecting an outbound token exchange for a single call.
pub const SESSION_ID_ARG: &str = "descope_session_id";

/// Argument key carrying a caller-supplied idempotency key.
pub const IDEMPOTENCY_KEY_ARG: &str = "idempotency_key";

/// Definition of a tool exposed through `/tools` and `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }

    /// Names listed under `required` in the input schema.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(Value::as_str)
    }
}

/// A tool invocation as received by a front end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// The `{ok, result | error}` wrapper returned for every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CallEnvelope {
    /// Create a success envelope.
    pub fn success(result: Value) -> Self {
        Self {
            ok: true,
            result: Some(result),
            error: None,
            details: None,
        }
    }

    /// Create a failure envelope.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            result: None,
            error: Some(error.into()),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Per-call metadata lifted out of the argument bag before typed decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallContext {
    pub session_id: Option<String>,
    pub idempotency_key: Option<String>,
}

impl CallContext {
    #[must_use]
    pub fn from_arguments(arguments: &Map<String, Value>) -> Self {
        let text = |key: &str| {
            arguments
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Self {
            session_id: text(SESSION_ID_ARG),
            idempotency_key: text(IDEMPOTENCY_KEY_ARG),
        }
    }
}
