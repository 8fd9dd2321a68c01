//! docwriter - Repository Documentation Writer
//!
//! Clones a git repository, asks an LLM-backed agent for a documentation
//! plan, then writes one MDX page per planned topic.
//!
//! ## Pipeline
//!
//! `FlowController::run(url)` drives the run:
//! fetch → plan → persist `plan.json` → generate and persist each topic.
//! Each topic's failure is isolated unless the failure policy is fail-fast.
//!
//! ## Quick Start
//!
//! ```ignore
//! use docwriter::{FlowController, FlowOptions, GitCloner, LlmAgents};
//! use docwriter::ai::{ProviderConfig, create_provider};
//!
//! let provider = create_provider(&ProviderConfig::default())?;
//! let controller = FlowController::new(
//!     Arc::new(LlmAgents::new(provider, Default::default())),
//!     Arc::new(GitCloner::new()),
//!     FlowOptions::default(),
//! );
//! let report = controller.run("https://github.com/org/repo").await?;
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: fetch, planning, generation, persistence and the flow controller
//! - [`agents`]: planning and writing capabilities backed by an LLM provider
//! - [`ai`]: LLM provider abstraction, JSON extraction, timeouts
//! - [`facade`]: message-returning operations for external callers
//! - [`mcp`]: MCP server exposing the facade over stdio
//! - [`config`]: layered configuration

pub mod agents;
pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod facade;
pub mod mcp;
pub mod pipeline;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader, FailurePolicy};
pub use types::{DocError, ErrorCategory, Result, RunId};

// =============================================================================
// Pipeline Re-exports
// =============================================================================

pub use agents::{DocumentationAgents, LlmAgents, PlanOutput};
pub use facade::{DocFacade, DocumentLibrary};
pub use pipeline::{
    CancelToken, FlowController, FlowOptions, FlowState, GitCloner, RepositoryCloner, RunReport,
    TopicOutcome, TopicPlan, TopicSpec,
};

// =============================================================================
// AI Re-exports
// =============================================================================

pub use ai::{LlmProvider, LlmResponse, SharedProvider, create_provider, with_timeout};
