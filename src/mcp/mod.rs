//! Model Context Protocol server exposing the documentation tools over stdio.

mod server;
mod tools;

pub use server::McpServer;
pub use tools::{ToolDefinition, ToolRegistry};
