//! List Command
//!
//! Usage:
//!   docwriter list

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::types::Result;

pub fn run() -> Result<()> {
    let context = CommandContext::load()?;
    let library = context.library();
    let output = Output::new();

    let documents = library.documents()?;
    if documents.is_empty() {
        output.warning(&format!(
            "No documents in {}. Run 'docwriter generate <URL>' first.",
            library.dir().display()
        ));
        return Ok(());
    }

    output.section(&format!("Documents in {}", library.dir().display()));
    for path in &documents {
        output.path(path);
    }
    println!("\nTotal: {} document(s)", documents.len());
    Ok(())
}
