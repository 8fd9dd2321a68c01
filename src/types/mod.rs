pub mod error;

pub use error::{DocError, ErrorCategory, ErrorClassifier, LlmError, PersistExt, Result};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe wrapper for pipeline run IDs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generate a fresh random run ID
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RunId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RunId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Text Helpers
// =============================================================================

/// Truncate content to at most `max_chars` characters, preferring a line break.
///
/// Appends a marker when anything was cut.
pub fn truncate_chars(content: &str, max_chars: usize) -> String {
    let Some((cut, _)) = content.char_indices().nth(max_chars) else {
        return content.to_string();
    };

    let truncated = &content[..cut];
    let kept = match truncated.rfind('\n') {
        Some(pos) if pos > cut / 2 => &truncated[..pos],
        _ => truncated,
    };

    format!("{}\n... [truncated]", kept)
}
