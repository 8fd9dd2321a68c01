//! Config Command
//!
//! Manage docwriter configuration.
//!
//! Usage:
//!   docwriter config show [--json]
//!   docwriter config path
//!   docwriter config init [--global] [--force]

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(as_json: bool) -> Result<()> {
    let context = CommandContext::load()?;
    println!("{}", ConfigLoader::render(&context.config, as_json)?);
    Ok(())
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file; existing files are kept unless `force`
pub fn init(global: bool, force: bool) -> Result<()> {
    let (scope, path) = if global {
        ("global", ConfigLoader::init_global(force)?)
    } else {
        ("project", ConfigLoader::init_project(force)?)
    };

    Output::new().success(&format!("Initialized {} configuration", scope));
    println!("  Config: {}", path.display());
    Ok(())
}
