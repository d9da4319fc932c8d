pub mod chat;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::{GatewayConfig, IntegrationKind};
pub use error::Error;
pub use traits::{Tool, ToolHandler};
pub use types::{CallContext, CallEnvelope, ToolCallRequest, ToolDescriptor};
