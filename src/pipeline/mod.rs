//! Documentation Pipeline
//!
//! Fetch → plan → persist plan → generate and persist each topic.

pub mod fetch;
pub mod flow;
pub mod generate;
pub mod persist;
pub mod plan;

pub use fetch::{
    GitCloner, RepositoryCloner, RepositoryFetcher, check_source_url, repo_name_from_url,
};
pub use flow::{
    CancelToken, FlowController, FlowOptions, FlowState, PipelineState, RunReport, TopicOutcome,
};
pub use generate::{DocumentationInvoker, TopicRequest};
pub use persist::{DocumentPersister, PlanPersister, force_remove, slugify};
pub use plan::{PlannedDocs, PlanningInvoker, TopicPlan, TopicSpec};
