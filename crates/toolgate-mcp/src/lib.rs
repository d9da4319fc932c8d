pub mod jsonrpc;
pub mod server;
pub mod tools;

pub use jsonrpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use server::McpServer;
pub use tools::ToolRegistry;
