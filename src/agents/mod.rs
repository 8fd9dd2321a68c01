//! Documentation agents
//!
//! The planning and writing capabilities the pipeline delegates to. The
//! pipeline only sees the `DocumentationAgents` trait; `LlmAgents` backs it
//! with an `LlmProvider`.

pub mod context;
pub mod prompts;

pub use context::{ContextOptions, KeyFile, RepositorySnapshot};

use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::ai::SharedProvider;
use crate::pipeline::TopicRequest;
use crate::types::{DocError, Result};

/// Raw output of the planning capability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutput {
    pub raw: String,
}

impl PlanOutput {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }
}

#[async_trait]
pub trait DocumentationAgents: Send + Sync {
    /// Propose a documentation plan for the repository at `repo_path`
    async fn plan(&self, repo_path: &Path) -> Result<PlanOutput>;

    /// Write the document for one planned topic
    async fn generate(&self, request: &TopicRequest) -> Result<String>;
}

pub type SharedAgents = Arc<dyn DocumentationAgents>;

/// Agents backed by a language model provider
pub struct LlmAgents {
    provider: SharedProvider,
    options: ContextOptions,
    snapshot: Mutex<Option<(PathBuf, Arc<String>)>>,
}

impl LlmAgents {
    pub fn new(provider: SharedProvider, options: ContextOptions) -> Self {
        Self {
            provider,
            options,
            snapshot: Mutex::new(None),
        }
    }

    /// Rendered snapshot of `repo_path`, reused across topics of the same run.
    /// `refresh` rebuilds it; planning starts every run on a fresh clone.
    async fn snapshot(&self, repo_path: &Path, refresh: bool) -> Result<Arc<String>> {
        let mut cached = self.snapshot.lock().await;
        if !refresh
            && let Some((path, rendered)) = cached.as_ref()
            && path == repo_path
        {
            return Ok(Arc::clone(rendered));
        }

        let root = repo_path.to_path_buf();
        let options = self.options.clone();
        let snapshot =
            tokio::task::spawn_blocking(move || RepositorySnapshot::collect(&root, &options))
                .await
                .map_err(|e| DocError::LlmApi(format!("Snapshot task failed: {}", e)))??;

        debug!(
            files = snapshot.total_files,
            key_files = snapshot.key_files.len(),
            "Collected repository snapshot"
        );

        let rendered = Arc::new(snapshot.render());
        *cached = Some((repo_path.to_path_buf(), Arc::clone(&rendered)));
        Ok(rendered)
    }
}

#[async_trait]
impl DocumentationAgents for LlmAgents {
    async fn plan(&self, repo_path: &Path) -> Result<PlanOutput> {
        let snapshot = self.snapshot(repo_path, true).await?;
        let prompt = prompts::planning_prompt(&snapshot);

        info!(provider = self.provider.name(), "Planning documentation");
        let response = self
            .provider
            .generate(&prompt, &prompts::plan_schema())
            .await?;

        info!(
            model = %response.metadata.model,
            tokens = response.usage.total(),
            elapsed_ms = response.timing.total_ms,
            "Plan received"
        );
        Ok(PlanOutput::new(response.text()))
    }

    async fn generate(&self, request: &TopicRequest) -> Result<String> {
        let snapshot = self.snapshot(&request.repo_path, false).await?;
        let prompt = prompts::writing_prompt(request, &snapshot);

        let response = self.provider.generate(&prompt, &Value::Null).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(DocError::generation(
                &request.title,
                "model returned an empty document",
            ));
        }

        debug!(
            title = %request.title,
            provider = %response.metadata.provider,
            model = %response.metadata.model,
            tokens = response.usage.total(),
            elapsed_ms = response.timing.total_ms,
            "Topic written"
        );
        Ok(text)
    }
}
