use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;

/// A JSON-RPC 2.0 request. A missing or null `id` marks a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    #[must_use]
    pub fn is_notification(&self) -> bool {
        self.id.is_null()
    }

    /// Decode one message as received from a transport.
    ///
    /// Bytes that are not JSON yield a -32700 response with a null id. JSON
    /// that is not a request object yields -32600, echoing the message's
    /// `id` when it has one.
    ///
    /// # Errors
    ///
    /// Returns the error response to send back in place of a result.
    pub fn parse(bytes: &[u8]) -> Result<Self, JsonRpcResponse> {
        let value: Value = serde_json::from_slice(bytes).map_err(|e| {
            JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}"))
        })?;

        let id = match value.get("id") {
            Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
            _ => Value::Null,
        };
        serde_json::from_value(value).map_err(|e| {
            JsonRpcResponse::error(id, INVALID_REQUEST, format!("Invalid request: {e}"))
        })
    }
}

/// A JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    /// Error code, if this is an error response.
    #[must_use]
    pub fn error_code(&self) -> Option<i32> {
        self.error.as_ref().map(|e| e.code)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_call_with_string_id() {
        let req = JsonRpcRequest::parse(
            br#"{"jsonrpc":"2.0","id":"c-1","method":"tools/call",
                 "params":{"name":"gmail_list_labels","arguments":{"user_google_email":"a@b.c"}}}"#,
        )
        .unwrap();
        assert_eq!(req.id, json!("c-1"));
        assert!(!req.is_notification());
        assert_eq!(req.params.unwrap()["arguments"]["user_google_email"], "a@b.c");
    }

    #[test]
    fn missing_and_null_ids_are_notifications() {
        for raw in [
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            r#"{"jsonrpc":"2.0","id":null,"method":"notifications/cancelled"}"#,
        ] {
            assert!(JsonRpcRequest::parse(raw.as_bytes()).unwrap().is_notification());
        }
    }

    #[test]
    fn garbage_is_parse_error() {
        let resp = JsonRpcRequest::parse(b"{\"jsonrpc\":").unwrap_err();
        assert_eq!(resp.error_code(), Some(PARSE_ERROR));
        assert_eq!(resp.id, Value::Null);
    }

    #[test]
    fn json_that_is_not_a_request_is_invalid_request() {
        let resp = JsonRpcRequest::parse(br#"{"jsonrpc":"2.0","id":4}"#).unwrap_err();
        assert_eq!(resp.error_code(), Some(INVALID_REQUEST));
        assert_eq!(resp.id, json!(4));

        for raw in [&b"[1,2]"[..], b"42", br#"{"id":{"x":1},"method":7}"#] {
            let resp = JsonRpcRequest::parse(raw).unwrap_err();
            assert_eq!(resp.error_code(), Some(INVALID_REQUEST));
            assert_eq!(resp.id, Value::Null);
        }
    }

    #[test]
    fn success_omits_error_field() {
        let resp = JsonRpcResponse::success(json!(1), json!({"tools": []}));
        assert_eq!(resp.error_code(), None);
        let encoded = serde_json::to_value(&resp).unwrap();
        assert_eq!(encoded, json!({"jsonrpc": "2.0", "id": 1, "result": {"tools": []}}));
    }
}
