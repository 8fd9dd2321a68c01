//! Serve Command
//!
//! Expose the documentation tools as an MCP server on stdin/stdout.
//!
//! Usage:
//!   docwriter serve

use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::info;

use crate::cli::{CommandContext, ConfigOverrides};
use crate::mcp::McpServer;
use crate::types::Result;

pub fn run(overrides: &ConfigOverrides) -> Result<()> {
    let context = CommandContext::load_with(overrides)?;
    let facade = Arc::new(context.facade()?);

    info!(
        provider = %context.config.llm.provider,
        output = %facade.output_dir().display(),
        "Serving documentation tools"
    );

    let server = McpServer::new(facade);
    let rt = Runtime::new()?;
    rt.block_on(server.run())
}
