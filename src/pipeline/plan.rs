//! Documentation plan: parsing, validation and the planning call.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::agents::SharedAgents;
use crate::ai::{extract_json, with_timeout};
use crate::constants::pipeline;
use crate::types::{DocError, Result};

/// One planned documentation unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSpec {
    pub title: String,
    pub description: String,
    pub prerequisites: String,
    pub examples: Vec<String>,
    pub goal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicPlan {
    pub overview: String,
    /// Generation order; `docs` is accepted as the key as well
    #[serde(alias = "docs")]
    pub topics: Vec<TopicSpec>,
}

impl TopicPlan {
    /// Parse raw planning output into a plan.
    ///
    /// Missing or mistyped fields are a `PlanValidation` error; an absent
    /// topic list is never read as an empty one.
    pub fn from_raw(raw: &str) -> Result<Self> {
        let value = extract_json(raw)
            .map_err(|e| DocError::PlanValidation(format!("output is not JSON: {}", e)))?;

        let plan: TopicPlan = serde_json::from_value(value)
            .map_err(|e| DocError::PlanValidation(e.to_string()))?;

        plan.validate()?;
        Ok(plan)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(index) = self.topics.iter().position(|t| t.title.trim().is_empty()) {
            return Err(DocError::PlanValidation(format!(
                "topic {} has an empty title",
                index + 1
            )));
        }
        Ok(())
    }
}

/// A validated plan together with the raw text it was parsed from
#[derive(Debug, Clone)]
pub struct PlannedDocs {
    pub plan: TopicPlan,
    pub raw: String,
}

pub struct PlanningInvoker {
    agents: SharedAgents,
    timeout: Duration,
}

impl PlanningInvoker {
    pub fn new(agents: SharedAgents) -> Self {
        Self {
            agents,
            timeout: Duration::from_secs(pipeline::PLAN_TIMEOUT_SECS),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn plan(&self, local_path: &Path) -> Result<PlannedDocs> {
        let output = with_timeout(self.timeout, self.agents.plan(local_path), "planning").await?;
        let plan = TopicPlan::from_raw(&output.raw)?;

        if plan.topics.is_empty() {
            warn!("Plan contains no topics");
        }
        info!(topics = plan.topics.len(), "Plan ready");

        Ok(PlannedDocs {
            plan,
            raw: output.raw,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{DocumentationAgents, PlanOutput};
    use crate::pipeline::TopicRequest;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Returns a fixed raw plan after an optional delay
    struct FixedPlanner {
        raw: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl DocumentationAgents for FixedPlanner {
        async fn plan(&self, _repo_path: &Path) -> Result<PlanOutput> {
            tokio::time::sleep(self.delay).await;
            Ok(PlanOutput::new(self.raw))
        }

        async fn generate(&self, _request: &TopicRequest) -> Result<String> {
            Ok(String::new())
        }
    }

    const PLAN: &str = r#"{
        "overview": "A sample repository",
        "docs": [
            {
                "title": "Overview",
                "description": "What it is",
                "prerequisites": "None",
                "examples": ["cargo run"],
                "goal": "Understand the project"
            }
        ]
    }"#;

    #[test]
    fn test_from_raw_accepts_docs_key() {
        let plan = TopicPlan::from_raw(PLAN).unwrap();
        assert_eq!(plan.overview, "A sample repository");
        assert_eq!(plan.topics.len(), 1);
        assert_eq!(plan.topics[0].examples, vec!["cargo run"]);
    }

    #[test]
    fn test_from_raw_accepts_topics_key() {
        let raw = PLAN.replace("\"docs\"", "\"topics\"");
        assert_eq!(TopicPlan::from_raw(&raw).unwrap().topics[0].title, "Overview");
    }

    #[test]
    fn test_missing_topics_is_not_empty_plan() {
        let err = TopicPlan::from_raw(r#"{"overview": "x"}"#).unwrap_err();
        assert!(matches!(err, DocError::PlanValidation(_)));
        assert!(err.to_string().contains("topics"));
    }

    #[test]
    fn test_malformed_field_rejected() {
        let raw = PLAN.replace("[\"cargo run\"]", "42");
        assert!(matches!(
            TopicPlan::from_raw(&raw),
            Err(DocError::PlanValidation(_))
        ));
    }

    #[test]
    fn test_empty_title_rejected() {
        let raw = PLAN.replace("\"Overview\"", "\"  \"");
        let err = TopicPlan::from_raw(&raw).unwrap_err();
        assert!(err.to_string().contains("topic 1"));
    }

    #[test]
    fn test_non_json_rejected() {
        assert!(matches!(
            TopicPlan::from_raw("I could not plan this repository."),
            Err(DocError::PlanValidation(_))
        ));
    }

    #[test]
    fn test_explicit_empty_list_is_valid() {
        let plan = TopicPlan::from_raw(r#"{"overview": "x", "topics": []}"#).unwrap();
        assert!(plan.topics.is_empty());
    }

    #[tokio::test]
    async fn test_invoker_keeps_raw_text() {
        let planner = PlanningInvoker::new(Arc::new(FixedPlanner {
            raw: PLAN,
            delay: Duration::ZERO,
        }));

        let planned = planner.plan(Path::new("workdir/repo")).await.unwrap();
        assert_eq!(planned.raw, PLAN);
        assert_eq!(planned.plan.topics[0].title, "Overview");
    }

    #[tokio::test]
    async fn test_invoker_timeout() {
        let planner = PlanningInvoker::new(Arc::new(FixedPlanner {
            raw: PLAN,
            delay: Duration::from_secs(5),
        }))
        .with_timeout(Duration::from_millis(20));

        let err = planner.plan(Path::new("workdir/repo")).await.unwrap_err();
        assert!(matches!(err, DocError::Timeout { .. }));
    }
}
