//! Repository snapshot handed to the planning and writing agents.
//!
//! A sorted, gitignore-aware file tree plus the contents of a few key files
//! (readme, manifests) from the repository root.

use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::context;
use crate::types::{Result, truncate_chars};

/// Directories never descended into
const SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "build",
    "dist",
    "__pycache__",
    "vendor",
    ".venv",
];

/// Root-level files whose contents are included
const KEY_FILE_PATTERNS: &[&str] = &[
    "README*",
    "readme*",
    "Cargo.toml",
    "package.json",
    "pyproject.toml",
    "setup.py",
    "go.mod",
    "pom.xml",
];

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub max_files: usize,
    pub max_file_chars: usize,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            max_files: context::MAX_TREE_FILES,
            max_file_chars: context::MAX_FILE_CHARS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KeyFile {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct RepositorySnapshot {
    pub root: PathBuf,
    /// Relative paths, sorted, capped at `max_files`
    pub files: Vec<String>,
    /// Number of files before the cap
    pub total_files: usize,
    pub key_files: Vec<KeyFile>,
}

impl RepositorySnapshot {
    pub fn collect(root: &Path, options: &ContextOptions) -> Result<Self> {
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .git_ignore(true)
            .git_global(false)
            .git_exclude(true)
            .require_git(false)
            .follow_links(false)
            .filter_entry(|entry| {
                entry.depth() == 0
                    || entry
                        .file_name()
                        .to_str()
                        .map(|name| !SKIP_DIRS.contains(&name))
                        .unwrap_or(true)
            })
            .build();

        let mut files: Vec<String> = walker
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_some_and(|t| t.is_file()))
            .filter_map(|entry| {
                entry
                    .path()
                    .strip_prefix(root)
                    .ok()
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
            })
            .collect();
        files.sort();

        let key_files = Self::read_key_files(root, &files, options.max_file_chars)?;

        let total_files = files.len();
        files.truncate(options.max_files);

        Ok(Self {
            root: root.to_path_buf(),
            files,
            total_files,
            key_files,
        })
    }

    fn read_key_files(root: &Path, files: &[String], max_chars: usize) -> Result<Vec<KeyFile>> {
        let patterns: Vec<glob::Pattern> = KEY_FILE_PATTERNS
            .iter()
            .filter_map(|p| glob::Pattern::new(p).ok())
            .collect();

        let mut key_files = Vec::new();
        for rel in files.iter().filter(|f| !f.contains('/')) {
            if !patterns.iter().any(|p| p.matches(rel)) {
                continue;
            }

            let path = root.join(rel);
            if path.metadata().map(|m| m.len()).unwrap_or(u64::MAX) > context::MAX_FILE_SIZE {
                continue;
            }

            // Binary or non-UTF-8 files are skipped
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            key_files.push(KeyFile {
                path: rel.clone(),
                content: truncate_chars(&content, max_chars),
            });
        }

        Ok(key_files)
    }

    /// Plain-text rendering embedded in prompts
    pub fn render(&self) -> String {
        let mut out = format!("Repository root: {}\n\n", self.root.display());

        out.push_str(&format!(
            "## File tree ({} of {} files)\n\n",
            self.files.len(),
            self.total_files
        ));
        for file in &self.files {
            out.push_str("- ");
            out.push_str(file);
            out.push('\n');
        }

        for key in &self.key_files {
            out.push_str(&format!("\n## {}\n\n```\n{}\n```\n", key.path, key.content));
        }

        out
    }
}
