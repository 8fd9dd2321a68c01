//! CLI Common Utilities
//!
//! Loads configuration once per command and builds the pipeline pieces the
//! command handlers need.

use std::path::PathBuf;
use std::sync::Arc;

use crate::agents::{ContextOptions, LlmAgents};
use crate::ai::{ProviderConfig, create_provider};
use crate::config::{Config, ConfigLoader, FailurePolicy};
use crate::facade::{DocFacade, DocumentLibrary};
use crate::pipeline::{FlowController, FlowOptions, GitCloner};
use crate::types::Result;

/// Command-line values taking precedence over every configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub fail_fast: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(output) = &self.output {
            config.workspace.output_dir = output.clone();
        }
        if let Some(workdir) = &self.workdir {
            config.workspace.work_dir = workdir.clone();
        }
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
            // A model named for another provider would not resolve
            if self.model.is_none() {
                config.llm.model = None;
            }
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if self.fail_fast {
            config.pipeline.failure_policy = FailurePolicy::FailFast;
        }
    }
}

/// Command execution context
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub config: Config,
}

impl CommandContext {
    pub fn load() -> Result<Self> {
        Self::load_with(&ConfigOverrides::default())
    }

    /// Load layered configuration, then apply command-line overrides
    pub fn load_with(overrides: &ConfigOverrides) -> Result<Self> {
        let mut config = ConfigLoader::load()?;
        overrides.apply(&mut config);
        Self::from_config(config)
    }

    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Document access without building a provider
    pub fn library(&self) -> DocumentLibrary {
        DocumentLibrary::new(self.config.workspace.output_dir.clone())
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions::from(&self.config)
    }

    pub fn context_options(&self) -> ContextOptions {
        ContextOptions {
            max_files: self.config.pipeline.max_context_files,
            max_file_chars: self.config.pipeline.max_file_chars,
        }
    }

    pub fn controller(&self) -> Result<FlowController> {
        let provider = create_provider(&ProviderConfig::from(&self.config.llm))?;
        let agents = LlmAgents::new(provider, self.context_options());

        Ok(FlowController::new(
            Arc::new(agents),
            Arc::new(GitCloner::new()),
            self.flow_options(),
        ))
    }

    pub fn facade(&self) -> Result<DocFacade> {
        Ok(DocFacade::new(self.controller()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_take_precedence() {
        let mut config = Config::default();
        config.llm.model = Some("deepseek-r1".into());

        let overrides = ConfigOverrides {
            output: Some(PathBuf::from("site/docs")),
            provider: Some("claude-code".into()),
            fail_fast: true,
            ..Default::default()
        };
        overrides.apply(&mut config);

        assert_eq!(config.workspace.output_dir, PathBuf::from("site/docs"));
        assert_eq!(config.workspace.work_dir, PathBuf::from("workdir"));
        assert_eq!(config.llm.provider, "claude-code");
        assert_eq!(config.llm.model, None);
        assert_eq!(config.pipeline.failure_policy, FailurePolicy::FailFast);
    }

    #[test]
    fn test_model_override_kept_with_provider() {
        let mut config = Config::default();
        let overrides = ConfigOverrides {
            provider: Some("openai".into()),
            model: Some("gpt-4o".into()),
            ..Default::default()
        };
        overrides.apply(&mut config);
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o"));
    }

    #[test]
    fn test_context_rejects_invalid_config() {
        let mut config = Config::default();
        config.pipeline.topic_timeout_secs = 0;
        assert!(CommandContext::from_config(config).is_err());
    }

    #[test]
    fn test_flow_options_follow_config() {
        let mut config = Config::default();
        config.workspace.isolate_runs = true;
        config.pipeline.max_file_chars = 100;
        let context = CommandContext::from_config(config).unwrap();

        assert!(context.flow_options().isolate_runs);
        assert_eq!(context.context_options().max_file_chars, 100);
        assert_eq!(context.library().dir(), std::path::Path::new("docs"));
    }
}
