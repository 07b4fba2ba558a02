//! MCP (Model Context Protocol) implementation.

mod handlers;
pub mod server;
mod tools;

pub use handlers::{parse_search_args, ToolContext};
pub use server::McpServer;
pub use tools::{error_envelope, Tool, ToolError, ToolHandler, ToolRegistry};
