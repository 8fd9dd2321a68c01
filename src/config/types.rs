//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/docwriter/) and project (.docwriter/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::constants::{context, layout, network, pipeline};
use crate::types::{DocError, Result};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Working and output directories
    pub workspace: WorkspaceConfig,

    /// Pipeline behavior
    pub pipeline: PipelineConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            workspace: WorkspaceConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `DocError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(DocError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(DocError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        for (name, secs) in [
            ("clone_timeout_secs", self.pipeline.clone_timeout_secs),
            ("plan_timeout_secs", self.pipeline.plan_timeout_secs),
            ("topic_timeout_secs", self.pipeline.topic_timeout_secs),
        ] {
            if secs == 0 {
                return Err(DocError::Config(format!(
                    "Pipeline {} must be greater than 0",
                    name
                )));
            }
        }

        if self.workspace.work_dir.as_os_str().is_empty() {
            return Err(DocError::Config("workspace.work_dir is empty".to_string()));
        }

        if self.workspace.output_dir.as_os_str().is_empty() {
            return Err(DocError::Config(
                "workspace.output_dir is empty".to_string(),
            ));
        }

        check_workspace_dirs(&self.workspace.work_dir, &self.workspace.output_dir)
    }
}

/// Reject an output directory whose reset would delete clones or the
/// working directory itself.
///
/// The plan persister clears the output directory on every run, so it must
/// not be the current directory, a filesystem root, or equal to, inside of,
/// or an ancestor of the clone directory. Paths are compared lexically
/// after making them absolute.
pub fn check_workspace_dirs(work_dir: &Path, output_dir: &Path) -> Result<()> {
    let work = lexical_absolute(work_dir)?;
    let output = lexical_absolute(output_dir)?;
    let cwd = lexical_absolute(Path::new("."))?;

    let reason = if output.parent().is_none() {
        Some("is a filesystem root")
    } else if output == cwd {
        Some("is the current directory")
    } else if work.starts_with(&output) {
        Some("contains the work directory")
    } else if output.starts_with(&work) {
        Some("is inside the work directory")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(DocError::Config(format!(
            "workspace.output_dir {} {}; it is cleared on every run",
            output_dir.display(),
            reason
        ))),
        None => Ok(()),
    }
}

/// Absolute form of `path` with `.` and `..` folded away, without touching
/// the filesystem
fn lexical_absolute(path: &Path) -> Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Ok(normalized)
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "claude-code", "ollama", "openai"
    pub provider: String,

    /// Model name (provider default when absent)
    pub model: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Temperature for LLM generation
    pub temperature: f32,

    /// Custom API endpoint
    pub api_base: Option<String>,

    /// Maximum tokens to generate
    pub max_tokens: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            timeout_secs: network::DEFAULT_TIMEOUT_SECS,
            temperature: 0.2,
            api_base: None,
            max_tokens: 8192,
        }
    }
}

// =============================================================================
// Workspace Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Base directory repositories are cloned into
    pub work_dir: PathBuf,

    /// Directory receiving plan.json and generated documents
    pub output_dir: PathBuf,

    /// Clone each run into its own `work_dir/<run-id>/` namespace
    pub isolate_runs: bool,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(layout::WORK_DIR),
            output_dir: PathBuf::from(layout::DOCS_DIR),
            isolate_runs: false,
        }
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// What happens when a single topic fails to generate or persist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Record the failure and continue with the next topic
    #[default]
    Continue,
    /// Abort the run on the first topic failure
    FailFast,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Continue => write!(f, "continue"),
            FailurePolicy::FailFast => write!(f, "fail-fast"),
        }
    }
}

impl std::str::FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "continue" => Ok(FailurePolicy::Continue),
            "fail-fast" | "fail_fast" | "failfast" => Ok(FailurePolicy::FailFast),
            _ => Err(format!(
                "Unknown failure policy: {}. Valid values: continue, fail-fast",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub failure_policy: FailurePolicy,

    /// Timeout for the repository clone (seconds)
    pub clone_timeout_secs: u64,

    /// Timeout for the planning call (seconds)
    pub plan_timeout_secs: u64,

    /// Timeout for each topic's generation call (seconds)
    pub topic_timeout_secs: u64,

    /// Maximum files listed in the repository snapshot
    pub max_context_files: usize,

    /// Maximum characters included per key file
    pub max_file_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Continue,
            clone_timeout_secs: pipeline::CLONE_TIMEOUT_SECS,
            plan_timeout_secs: pipeline::PLAN_TIMEOUT_SECS,
            topic_timeout_secs: pipeline::TOPIC_TIMEOUT_SECS,
            max_context_files: context::MAX_TREE_FILES,
            max_file_chars: context::MAX_FILE_CHARS,
        }
    }
}

impl PipelineConfig {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn plan_timeout(&self) -> Duration {
        Duration::from_secs(self.plan_timeout_secs)
    }

    pub fn topic_timeout(&self) -> Duration {
        Duration::from_secs(self.topic_timeout_secs)
    }
}

// =============================================================================
// Tests
// =============================================================================
