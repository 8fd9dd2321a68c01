//! AI Integration Layer
//!
//! LLM providers backing the documentation agents.

pub mod json;
pub mod provider;
pub mod timeout;

pub use json::extract_json;
pub use provider::{
    ClaudeCodeProvider, ErrorCategory, ErrorClassifier, LlmError, LlmProvider, LlmResponse,
    OllamaProvider, OpenAiProvider, ProviderConfig, ResponseMetadata, ResponseTiming,
    SharedProvider, TokenUsage, create_provider,
};
pub use timeout::with_timeout;
