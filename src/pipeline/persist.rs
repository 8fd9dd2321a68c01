//! Plan and document persistence.
//!
//! Layout under the output directory:
//! - `plan.json`: raw planning output, replaced on every run
//! - `<slug>.mdx`: one file per topic, slug derived from the title

use std::fs::{self, Permissions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::constants::layout;
use crate::types::{PersistExt, Result};

/// Derive a document file name from a topic title.
///
/// Lowercases the title and maps each space to `_`. Path separators are
/// mapped the same way so a title can never address a file outside the
/// output directory. Distinct titles may collide; the later write wins.
pub fn slugify(title: &str) -> String {
    let stem: String = title
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => layout::SLUG_SEPARATOR,
            other => other,
        })
        .collect();
    format!("{}.{}", stem, layout::DOC_EXTENSION)
}

/// Remove a file or directory tree, overriding read-only permission bits.
///
/// A missing path is not an error.
pub fn force_remove(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };

    if !metadata.is_dir() {
        return fs::remove_file(path).or_else(|_| {
            make_writable(path)?;
            fs::remove_file(path)
        });
    }

    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(_) => {
            debug!("Retrying removal of {} with permissions reset", path.display());
            make_writable(path)?;
            fs::remove_dir_all(path)
        }
    }
}

fn make_writable(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    grant_owner_write(&mut permissions, metadata.is_dir());
    fs::set_permissions(path, permissions)?;

    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn grant_owner_write(permissions: &mut Permissions, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;
    let owner = if is_dir { 0o700 } else { 0o600 };
    permissions.set_mode(permissions.mode() | owner);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn grant_owner_write(permissions: &mut Permissions, _is_dir: bool) {
    permissions.set_readonly(false);
}

// =============================================================================
// Plan
// =============================================================================

pub struct PlanPersister {
    output_dir: PathBuf,
}

impl PlanPersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Clear the output directory, then write `plan.json` with `raw` verbatim
    pub fn save(&self, raw: &str) -> Result<PathBuf> {
        force_remove(&self.output_dir).persist_context(&self.output_dir)?;
        fs::create_dir_all(&self.output_dir).persist_context(&self.output_dir)?;

        let path = self.output_dir.join(layout::PLAN_FILE);
        fs::write(&path, raw).persist_context(&path)?;

        debug!(path = %path.display(), bytes = raw.len(), "Plan saved");
        Ok(path)
    }
}

// =============================================================================
// Documents
// =============================================================================

pub struct DocumentPersister {
    output_dir: PathBuf,
}

impl DocumentPersister {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn path_for(&self, title: &str) -> PathBuf {
        self.output_dir.join(slugify(title))
    }

    /// Write `text` verbatim to the slug path; siblings are left untouched
    pub fn save(&self, title: &str, text: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).persist_context(&self.output_dir)?;

        let path = self.path_for(title);
        fs::write(&path, text).persist_context(&path)?;

        debug!(path = %path.display(), "Document saved");
        Ok(path)
    }
}
