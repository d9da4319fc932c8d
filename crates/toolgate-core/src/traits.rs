use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Error;
use crate::types::{CallContext, ToolDescriptor};

/// Executes one tool against its backing integration.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool with an argument object that has already passed the
    /// registry's required-field check.
    async fn call(&self, ctx: CallContext, arguments: Value) -> Result<Value, Error>;
}

/// A registered tool: its public descriptor plus the handler behind it.
#[derive(Clone)]
pub struct Tool {
    pub descriptor: ToolDescriptor,
    pub handler: Arc<dyn ToolHandler>,
}

impl Tool {
    pub fn new(descriptor: ToolDescriptor, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            descriptor,
            handler,
        }
    }

    /// Bind a descriptor to a client method taking a typed argument struct.
    ///
    /// The argument bag is decoded into `A` before `handler` runs; a decode
    /// failure is reported as [`Error::InvalidArguments`].
    pub fn typed<C, A, F, Fut>(descriptor: ToolDescriptor, client: &Arc<C>, handler: F) -> Self
    where
        C: Send + Sync + 'static,
        A: DeserializeOwned + Send + 'static,
        F: Fn(Arc<C>, CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, Error>> + Send + 'static,
    {
        Self::new(
            descriptor,
            Arc::new(TypedHandler {
                client: Arc::clone(client),
                handler,
                _args: PhantomData,
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.descriptor.name)
            .finish_non_exhaustive()
    }
}

struct TypedHandler<C, A, F> {
    client: Arc<C>,
    handler: F,
    _args: PhantomData<fn() -> A>,
}

#[async_trait]
impl<C, A, F, Fut> ToolHandler for TypedHandler<C, A, F>
where
    C: Send + Sync + 'static,
    A: DeserializeOwned + Send + 'static,
    F: Fn(Arc<C>, CallContext, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, Error>> + Send + 'static,
{
    async fn call(&self, ctx: CallContext, arguments: Value) -> Result<Value, Error> {
        let args: A = serde_json::from_value(arguments)
            .map_err(|e| Error::InvalidArguments(e.to_string()))?;
        (self.handler)(Arc::clone(&self.client), ctx, args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    struct Greeter {
        greeting: String,
    }

    #[derive(Deserialize)]
    struct GreetArgs {
        name: String,
        #[serde(default)]
        shout: bool,
    }

    impl Greeter {
        async fn greet(self: Arc<Self>, ctx: CallContext, args: GreetArgs) -> Result<Value, Error> {
            let mut text = format!("{}, {}", self.greeting, args.name);
            if args.shout {
                text = text.to_uppercase();
            }
            Ok(json!({ "text": text, "session": ctx.session_id }))
        }
    }

    fn greet_tool() -> Tool {
        let client = Arc::new(Greeter {
            greeting: "hello".to_string(),
        });
        Tool::typed(
            ToolDescriptor::new("greet", "Greet someone", json!({"type": "object"})),
            &client,
            Greeter::greet,
        )
    }

    #[tokio::test]
    async fn typed_handler_decodes_arguments() {
        let tool = greet_tool();
        let ctx = CallContext {
            session_id: Some("s-1".to_string()),
            idempotency_key: None,
        };
        let out = tool
            .handler
            .call(ctx, json!({"name": "ada", "shout": true}))
            .await
            .unwrap();
        assert_eq!(out, json!({"text": "HELLO, ADA", "session": "s-1"}));
    }

    #[tokio::test]
    async fn typed_handler_rejects_bad_arguments() {
        let tool = greet_tool();
        let err = tool
            .handler
            .call(CallContext::default(), json!({"name": 42}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
    }

    #[test]
    fn debug_shows_name() {
        assert!(format!("{:?}", greet_tool()).contains("greet"));
    }
}
