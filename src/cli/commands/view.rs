//! View Command
//!
//! Usage:
//!   docwriter view <PATH>

use console::style;

use crate::cli::CommandContext;
use crate::types::Result;

pub fn run(path: &str) -> Result<()> {
    let context = CommandContext::load()?;
    let content = context.library().read_document(path)?;

    eprintln!(
        "{} {} ({} characters)",
        style("📄").bold(),
        path,
        content.chars().count()
    );
    println!("{}", content);
    Ok(())
}
