use std::collections::HashMap;

use serde_json::{Map, Value};

use toolgate_core::{CallContext, Error, Tool, ToolDescriptor};

/// Explicit name -> handler table for every tool the gateway exposes.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Build a registry from the given tools, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if two tools share a name.
    pub fn new(tools: Vec<Tool>) -> Result<Self, Error> {
        let mut index = HashMap::with_capacity(tools.len());
        for (i, tool) in tools.iter().enumerate() {
            if index.insert(tool.name().to_string(), i).is_some() {
                return Err(Error::Internal(format!(
                    "duplicate tool name: {}",
                    tool.name()
                )));
            }
        }
        Ok(Self { tools, index })
    }

    /// Descriptors for `/tools` and `tools/list`, in registration order.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.descriptor.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Route a call to its handler.
    ///
    /// Required fields are checked against the descriptor before the handler
    /// runs, so a rejected call never reaches the backing service.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownTool`] for unregistered names, [`Error::MissingArgument`]
    /// or [`Error::InvalidArguments`] for bad argument bags, otherwise whatever
    /// the handler returns.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<Value, Error> {
        let tool = self
            .get(name)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))?;

        let arguments = match arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            other => {
                return Err(Error::InvalidArguments(format!(
                    "arguments must be an object, got {}",
                    json_type(&other)
                )))
            }
        };

        check_required(&tool.descriptor, &arguments)?;

        let ctx = CallContext::from_arguments(&arguments);
        tracing::debug!(tool = name, "dispatching tool call");

        let result = tool.handler.call(ctx, Value::Object(arguments)).await;
        if let Err(err) = &result {
            tracing::warn!(tool = name, error = %err, "tool call failed");
        }
        result
    }
}

/// A required field must be present, non-null and, for strings, non-empty.
fn check_required(descriptor: &ToolDescriptor, arguments: &Map<String, Value>) -> Result<(), Error> {
    for field in descriptor.required_fields() {
        let present = match arguments.get(field) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.is_empty(),
            Some(_) => true,
        };
        if !present {
            return Err(Error::MissingArgument(field.to_string()));
        }
    }
    Ok(())
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::json;
    use toolgate_core::ToolHandler;

    use super::*;

    #[derive(Default)]
    struct CountingHandler {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ToolHandler for CountingHandler {
        async fn call(&self, ctx: CallContext, arguments: Value) -> Result<Value, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!({ "echo": arguments, "session": ctx.session_id }))
        }
    }

    fn tool(name: &str, handler: &Arc<CountingHandler>) -> Tool {
        Tool::new(
            ToolDescriptor::new(
                name,
                format!("{name} description"),
                json!({
                    "type": "object",
                    "properties": { "text": { "type": "string" } },
                    "required": ["text"]
                }),
            ),
            Arc::clone(handler) as Arc<dyn ToolHandler>,
        )
    }

    #[test]
    fn definitions_keep_registration_order() {
        let handler = Arc::new(CountingHandler::default());
        let registry =
            ToolRegistry::new(vec![tool("b_tool", &handler), tool("a_tool", &handler)]).unwrap();
        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["b_tool", "a_tool"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("a_tool").is_some());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let handler = Arc::new(CountingHandler::default());
        let err = ToolRegistry::new(vec![tool("same", &handler), tool("same", &handler)])
            .unwrap_err();
        assert!(matches!(err, Error::Internal(msg) if msg.contains("same")));
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error() {
        let registry = ToolRegistry::default();
        let err = registry.call("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTool(ref name) if name == "nope"));
        assert_eq!(err.to_string(), "Unknown tool: nope");
    }

    #[tokio::test]
    async fn missing_required_field_skips_handler() {
        let handler = Arc::new(CountingHandler::default());
        let registry = ToolRegistry::new(vec![tool("post", &handler)]).unwrap();

        for args in [json!({}), json!(null), json!({"text": ""}), json!({"text": null})] {
            let err = registry.call("post", args).await.unwrap_err();
            assert!(matches!(err, Error::MissingArgument(ref f) if f == "text"));
        }
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let handler = Arc::new(CountingHandler::default());
        let registry = ToolRegistry::new(vec![tool("post", &handler)]).unwrap();
        let err = registry.call("post", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(msg) if msg.contains("array")));
        assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn valid_call_reaches_handler_with_context() {
        let handler = Arc::new(CountingHandler::default());
        let registry = ToolRegistry::new(vec![tool("post", &handler)]).unwrap();
        let out = registry
            .call("post", json!({"text": "hi", "descope_session_id": "sess-1"}))
            .await
            .unwrap();
        assert_eq!(out["echo"]["text"], "hi");
        assert_eq!(out["session"], "sess-1");
        assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    }
}
