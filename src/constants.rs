//! Global Constants
//!
//! Centralized constants for configuration and tuning.

/// Output layout constants
pub mod layout {
    /// Default output directory for plan and documents
    pub const DOCS_DIR: &str = "docs";

    /// Default base directory for cloned repositories
    pub const WORK_DIR: &str = "workdir";

    /// Plan file name inside the output directory
    pub const PLAN_FILE: &str = "plan.json";

    /// Extension of generated documents
    pub const DOC_EXTENSION: &str = "mdx";

    /// Extensions the viewer accepts
    pub const VIEWABLE_EXTENSIONS: &[&str] = &["mdx", "md"];

    /// Replacement for spaces in derived file names
    pub const SLUG_SEPARATOR: char = '_';

    /// Project-level data directory
    pub const PROJECT_DIR: &str = ".docwriter";
}

/// Pipeline constants
pub mod pipeline {
    /// Clone timeout (seconds)
    pub const CLONE_TIMEOUT_SECS: u64 = 600;

    /// Planning call timeout (seconds)
    pub const PLAN_TIMEOUT_SECS: u64 = 900;

    /// Per-topic generation timeout (seconds)
    pub const TOPIC_TIMEOUT_SECS: u64 = 900;
}

/// Repository snapshot constants
pub mod context {
    /// Maximum files listed in the repository tree
    pub const MAX_TREE_FILES: usize = 400;

    /// Maximum characters taken from one key file
    pub const MAX_FILE_CHARS: usize = 8_000;

    /// Maximum size of a file considered for inclusion (1MB)
    pub const MAX_FILE_SIZE: u64 = 1_048_576;
}

/// HTTP/Network constants
pub mod network {
    /// Default request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;
}

/// MCP server constants
pub mod mcp {
    pub const SERVER_NAME: &str = "doc-writer";

    pub const PROTOCOL_VERSION: &str = "2024-11-05";
}
