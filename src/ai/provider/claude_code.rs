//! Claude Code CLI Provider
//!
//! Runs the local `claude` CLI in print mode. Structured calls pass the schema
//! through `--json-schema`; free-text calls return the `result` string as is.

use async_trait::async_trait;
use serde_json::Value;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info};

use super::{
    LlmProvider, LlmResponse, ProviderConfig, ResponseMetadata, ResponseTiming, TokenUsage,
};
use crate::ai::json::extract_json;
use crate::types::{DocError, Result};

const DEFAULT_MODEL: &str = "sonnet";

pub struct ClaudeCodeProvider {
    model: String,
    timeout_secs: u64,
    temperature: f32,
}

impl ClaudeCodeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            model: config.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: config.timeout_secs,
            temperature: config.temperature,
        }
    }

    async fn execute(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        let start_time = Instant::now();

        let mut cmd = Command::new("claude");
        cmd.arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("json")
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if !schema.is_null() {
            cmd.arg("--json-schema").arg(serde_json::to_string(schema)?);
        }

        let child = cmd.spawn().map_err(|e| {
            DocError::LlmApi(format!(
                "Failed to spawn Claude Code CLI: {}. Is it installed?",
                e
            ))
        })?;

        let output = timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| DocError::timeout("claude-code call", Duration::from_secs(self.timeout_secs)))?
        .map_err(|e| DocError::LlmApi(format!("Claude Code execution failed: {}", e)))?;

        let elapsed = start_time.elapsed();
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            if let Ok(response) = serde_json::from_str::<Value>(&stdout)
                && response
                    .get("is_error")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            {
                let error_msg = response
                    .get("result")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Unknown API error");
                return Err(DocError::LlmApi(format!(
                    "Claude Code API error: {}",
                    error_msg
                )));
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            let error_msg = if stderr.trim().is_empty() {
                "Process exited with non-zero status"
            } else {
                stderr.trim()
            };
            return Err(DocError::LlmApi(format!(
                "Claude Code failed: {}",
                error_msg
            )));
        }

        let response: Value = serde_json::from_str(&stdout).map_err(|e| {
            DocError::LlmApi(format!("Failed to parse Claude Code output: {}", e))
        })?;

        let content = Self::extract_content(&response, schema)?;

        Ok(LlmResponse::with_metrics(
            content,
            Self::extract_usage(&response),
            ResponseTiming::from_duration(elapsed),
            ResponseMetadata {
                model: self.model.clone(),
                provider: "claude-code".to_string(),
            },
        ))
    }

    fn extract_content(response: &Value, schema: &Value) -> Result<Value> {
        if !schema.is_null()
            && let Some(structured) = response.get("structured_output")
        {
            return Ok(structured.clone());
        }

        match response.get("result") {
            Some(Value::String(s)) if schema.is_null() => Ok(Value::String(s.trim().to_string())),
            Some(Value::String(s)) => extract_json(s),
            Some(result) if result.is_object() || result.is_array() => Ok(result.clone()),
            _ => Err(DocError::LlmApi(
                "No result in Claude Code response".to_string(),
            )),
        }
    }

    fn extract_usage(response: &Value) -> TokenUsage {
        let count = |key: &str| {
            response
                .get("usage")
                .and_then(|u| u.get(key))
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32
        };

        TokenUsage {
            input_tokens: count("input_tokens"),
            output_tokens: count("output_tokens"),
        }
    }
}

#[async_trait]
impl LlmProvider for ClaudeCodeProvider {
    async fn generate(&self, prompt: &str, schema: &Value) -> Result<LlmResponse> {
        info!(
            "Generating with Claude Code CLI (model: {}, temperature: {})",
            self.model, self.temperature
        );
        let response = self.execute(prompt, schema).await?;
        debug!(tokens = response.usage.total(), "Claude Code call finished");
        Ok(response)
    }

    fn name(&self) -> &str {
        "claude-code"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        let output = Command::new("claude")
            .arg("--version")
            .output()
            .await
            .map_err(|e| DocError::LlmApi(format!("Claude Code not found: {}", e)))?;

        if output.status.success() {
            let version = String::from_utf8_lossy(&output.stdout);
            info!("Claude Code CLI available: {}", version.trim());
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    #[ignore = "requires claude CLI installed"]
    async fn test_health_check() {
        let provider = ClaudeCodeProvider::new(ProviderConfig::default());
        assert!(provider.health_check().await.is_ok());
    }

    #[test]
    fn test_extract_usage() {
        let response = json!({
            "usage": {"input_tokens": 1000, "output_tokens": 500}
        });

        let usage = ClaudeCodeProvider::extract_usage(&response);
        assert_eq!(usage.input_tokens, 1000);
        assert_eq!(usage.output_tokens, 500);
        assert_eq!(usage.total(), 1500);
    }

    #[test]
    fn test_extract_content_structured() {
        let schema = json!({"type": "object"});
        let response = json!({"structured_output": {"overview": "o", "docs": []}});
        let content = ClaudeCodeProvider::extract_content(&response, &schema).unwrap();
        assert_eq!(content["overview"], "o");

        let fenced = json!({"result": "```json\n{\"overview\": \"f\"}\n```"});
        let content = ClaudeCodeProvider::extract_content(&fenced, &schema).unwrap();
        assert_eq!(content["overview"], "f");
    }

    #[test]
    fn test_extract_content_free_text() {
        let response = json!({"result": "  # Overview\n\nText\n"});
        let content = ClaudeCodeProvider::extract_content(&response, &Value::Null).unwrap();
        assert_eq!(content, Value::String("# Overview\n\nText".into()));

        let empty = json!({"usage": {}});
        assert!(ClaudeCodeProvider::extract_content(&empty, &Value::Null).is_err());
    }
}
