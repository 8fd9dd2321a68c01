//! Pipeline state machine.
//!
//! ```text
//! Idle -> Fetching -> Planning -> PersistingPlan -> GeneratingDocs -> Done
//!            \            \                              \
//!             +------------+------------------------------+--> Failed
//! ```
//!
//! Fetch and plan failures abort the run. Plan persistence failures are
//! recorded and generation proceeds. Topic failures follow the configured
//! `FailurePolicy`. Cancellation is checked before each topic.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{info, instrument, warn};

use super::fetch::{RepositoryCloner, RepositoryFetcher};
use super::generate::DocumentationInvoker;
use super::persist::{DocumentPersister, PlanPersister};
use super::plan::{PlanningInvoker, TopicSpec};
use crate::agents::SharedAgents;
use crate::config::{Config, FailurePolicy, check_workspace_dirs};
use crate::constants::{layout, pipeline};
use crate::types::{DocError, Result, RunId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Fetching,
    Planning,
    PersistingPlan,
    GeneratingDocs,
    Done,
    Failed,
}

impl FlowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Done | FlowState::Failed)
    }
}

impl std::fmt::Display for FlowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FlowState::Idle => "idle",
            FlowState::Fetching => "fetching",
            FlowState::Planning => "planning",
            FlowState::PersistingPlan => "persisting_plan",
            FlowState::GeneratingDocs => "generating_docs",
            FlowState::Done => "done",
            FlowState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Mutable state of one run
#[derive(Debug, Clone)]
pub struct PipelineState {
    source_url: String,
    local_path: Option<PathBuf>,
    produced_document_paths: Vec<PathBuf>,
    state: FlowState,
}

impl PipelineState {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            local_path: None,
            produced_document_paths: Vec::new(),
            state: FlowState::Idle,
        }
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn local_path(&self) -> Option<&Path> {
        self.local_path.as_deref()
    }

    pub fn produced_document_paths(&self) -> &[PathBuf] {
        &self.produced_document_paths
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    fn transition(&mut self, next: FlowState) {
        info!(from = %self.state, to = %next, "Pipeline state change");
        self.state = next;
    }

    fn fail(&mut self, error: &DocError) {
        warn!(state = %self.state, error = %error, "Pipeline failed");
        self.state = FlowState::Failed;
    }

    /// Append only after the document is on disk
    fn record_document(&mut self, path: PathBuf) {
        self.produced_document_paths.push(path);
    }
}

/// Result of one planned topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TopicOutcome {
    Written { title: String, path: PathBuf },
    Failed { title: String, reason: String },
    Skipped { title: String },
}

impl TopicOutcome {
    pub fn title(&self) -> &str {
        match self {
            TopicOutcome::Written { title, .. }
            | TopicOutcome::Failed { title, .. }
            | TopicOutcome::Skipped { title } => title,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub source_url: String,
    pub local_path: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub final_state: FlowState,
    pub plan_path: Option<PathBuf>,
    pub plan_error: Option<String>,
    pub outcomes: Vec<TopicOutcome>,
    pub produced_paths: Vec<PathBuf>,
    pub cancelled: bool,
}

impl RunReport {
    /// Every topic written and the plan saved
    pub fn is_complete(&self) -> bool {
        self.final_state == FlowState::Done
            && self.plan_error.is_none()
            && self
                .outcomes
                .iter()
                .all(|o| matches!(o, TopicOutcome::Written { .. }))
    }

    pub fn failed_topics(&self) -> Vec<&TopicOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, TopicOutcome::Failed { .. }))
            .collect()
    }
}

/// Cooperative cancellation, observed at topic boundaries
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Explicit run parameters; the controller reads no global configuration
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub work_dir: PathBuf,
    pub output_dir: PathBuf,
    pub isolate_runs: bool,
    pub failure_policy: FailurePolicy,
    pub clone_timeout: Duration,
    pub plan_timeout: Duration,
    pub topic_timeout: Duration,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from(layout::WORK_DIR),
            output_dir: PathBuf::from(layout::DOCS_DIR),
            isolate_runs: false,
            failure_policy: FailurePolicy::default(),
            clone_timeout: Duration::from_secs(pipeline::CLONE_TIMEOUT_SECS),
            plan_timeout: Duration::from_secs(pipeline::PLAN_TIMEOUT_SECS),
            topic_timeout: Duration::from_secs(pipeline::TOPIC_TIMEOUT_SECS),
        }
    }
}

impl FlowOptions {
    /// Checked before anything is cloned or cleared
    pub fn validate(&self) -> Result<()> {
        check_workspace_dirs(&self.work_dir, &self.output_dir)
    }
}

impl From<&Config> for FlowOptions {
    fn from(config: &Config) -> Self {
        Self {
            work_dir: config.workspace.work_dir.clone(),
            output_dir: config.workspace.output_dir.clone(),
            isolate_runs: config.workspace.isolate_runs,
            failure_policy: config.pipeline.failure_policy,
            clone_timeout: config.pipeline.clone_timeout(),
            plan_timeout: config.pipeline.plan_timeout(),
            topic_timeout: config.pipeline.topic_timeout(),
        }
    }
}

pub struct FlowController {
    agents: SharedAgents,
    cloner: Arc<dyn RepositoryCloner>,
    options: FlowOptions,
}

impl FlowController {
    pub fn new(
        agents: SharedAgents,
        cloner: Arc<dyn RepositoryCloner>,
        options: FlowOptions,
    ) -> Self {
        Self {
            agents,
            cloner,
            options,
        }
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    pub async fn run(&self, source_url: &str) -> Result<RunReport> {
        self.run_with_cancel(source_url, &CancelToken::new()).await
    }

    #[instrument(skip(self, cancel), fields(run_id = tracing::field::Empty))]
    pub async fn run_with_cancel(
        &self,
        source_url: &str,
        cancel: &CancelToken,
    ) -> Result<RunReport> {
        let run_id = RunId::generate();
        tracing::Span::current().record("run_id", run_id.as_str());
        let started_at = Utc::now();
        let mut state = PipelineState::new(source_url);

        if let Err(e) = self.options.validate() {
            state.fail(&e);
            return Err(e);
        }

        state.transition(FlowState::Fetching);
        let fetcher = RepositoryFetcher::new(self.work_base(&run_id), Arc::clone(&self.cloner))
            .with_timeout(self.options.clone_timeout);
        let local_path = match fetcher.materialize(source_url).await {
            Ok(path) => path,
            Err(e) => {
                state.fail(&e);
                return Err(e);
            }
        };
        state.local_path = Some(local_path.clone());

        state.transition(FlowState::Planning);
        let planner = PlanningInvoker::new(Arc::clone(&self.agents))
            .with_timeout(self.options.plan_timeout);
        let planned = match planner.plan(&local_path).await {
            Ok(planned) => planned,
            Err(e) => {
                state.fail(&e);
                return Err(e);
            }
        };

        state.transition(FlowState::PersistingPlan);
        let (plan_path, plan_error) = match PlanPersister::new(&self.options.output_dir)
            .save(&planned.raw)
        {
            Ok(path) => (Some(path), None),
            Err(e) => {
                warn!(error = %e, "Plan not saved, continuing with generation");
                (None, Some(e.to_string()))
            }
        };

        state.transition(FlowState::GeneratingDocs);
        let invoker = DocumentationInvoker::new(Arc::clone(&self.agents))
            .with_timeout(self.options.topic_timeout);
        let persister = DocumentPersister::new(&self.options.output_dir);
        let overview = &planned.plan.overview;
        let topics = &planned.plan.topics;

        let mut outcomes = Vec::with_capacity(topics.len());
        let mut cancelled = false;

        for (index, topic) in topics.iter().enumerate() {
            if cancelled || cancel.is_cancelled() {
                cancelled = true;
                outcomes.push(TopicOutcome::Skipped {
                    title: topic.title.clone(),
                });
                continue;
            }

            info!(
                topic = %topic.title,
                "Generating topic {}/{}",
                index + 1,
                topics.len()
            );

            match Self::write_topic(&invoker, &persister, &local_path, overview, topic).await {
                Ok(path) => {
                    state.record_document(path.clone());
                    outcomes.push(TopicOutcome::Written {
                        title: topic.title.clone(),
                        path,
                    });
                }
                Err(e) => {
                    if self.options.failure_policy == FailurePolicy::FailFast {
                        state.fail(&e);
                        return Err(e);
                    }
                    warn!(topic = %topic.title, error = %e, "Topic failed, continuing");
                    outcomes.push(TopicOutcome::Failed {
                        title: topic.title.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if cancelled {
            warn!("Run cancelled before all topics were generated");
            state.transition(FlowState::Failed);
        } else {
            state.transition(FlowState::Done);
        }

        Ok(RunReport {
            run_id,
            source_url: state.source_url.clone(),
            local_path,
            started_at,
            finished_at: Utc::now(),
            final_state: state.state,
            plan_path,
            plan_error,
            outcomes,
            produced_paths: state.produced_document_paths,
            cancelled,
        })
    }

    async fn write_topic(
        invoker: &DocumentationInvoker,
        persister: &DocumentPersister,
        local_path: &Path,
        overview: &str,
        topic: &TopicSpec,
    ) -> Result<PathBuf> {
        let text = invoker.generate(local_path, overview, topic).await?;
        persister.save(&topic.title, &text)
    }

    fn work_base(&self, run_id: &RunId) -> PathBuf {
        if self.options.isolate_runs {
            self.options.work_dir.join(run_id.as_str())
        } else {
            self.options.work_dir.clone()
        }
    }
}
