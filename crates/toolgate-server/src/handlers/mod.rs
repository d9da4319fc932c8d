mod health;
mod mcp;
mod tools;
mod ui;

pub use health::health;
pub use mcp::{mcp_delete, mcp_request, SESSION_HEADER};
pub use tools::{call_tool, list_tools};
pub use ui::index;
