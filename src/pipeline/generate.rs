//! Per-topic generation call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::plan::TopicSpec;
use crate::agents::SharedAgents;
use crate::ai::with_timeout;
use crate::constants::pipeline;
use crate::types::{DocError, Result};

/// Everything the writing agent receives for one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRequest {
    pub repo_path: PathBuf,
    pub overview: String,
    pub title: String,
    pub description: String,
    pub prerequisites: String,
    pub goal: String,
    /// Examples joined with `\n`
    pub examples: String,
}

impl TopicRequest {
    pub fn new(repo_path: &Path, overview: &str, topic: &TopicSpec) -> Self {
        Self {
            repo_path: repo_path.to_path_buf(),
            overview: overview.to_string(),
            title: topic.title.clone(),
            description: topic.description.clone(),
            prerequisites: topic.prerequisites.clone(),
            goal: topic.goal.clone(),
            examples: topic.examples.join("\n"),
        }
    }
}

pub struct DocumentationInvoker {
    agents: SharedAgents,
    timeout: Duration,
}

impl DocumentationInvoker {
    pub fn new(agents: SharedAgents) -> Self {
        Self {
            agents,
            timeout: Duration::from_secs(pipeline::TOPIC_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Generate one document. Failures other than timeouts are reported as
    /// `Generation` errors naming the topic.
    pub async fn generate(
        &self,
        local_path: &Path,
        overview: &str,
        topic: &TopicSpec,
    ) -> Result<String> {
        let request = TopicRequest::new(local_path, overview, topic);
        let operation = format!("generating '{}'", topic.title);

        with_timeout(self.timeout, self.agents.generate(&request), &operation)
            .await
            .map_err(|e| match e {
                DocError::Generation { .. } | DocError::Timeout { .. } => e,
                other => DocError::generation(&topic.title, other.to_string()),
            })
    }
}
