//! MCP Server implementation using JSON-RPC 2.0 over stdio
//!
//! One JSON message per line. Handled methods:
//! - `initialize` - Return server info and capabilities
//! - `tools/list` - Return available tool definitions
//! - `tools/call` - Execute a tool and return its text result
//! - `ping`, `shutdown`
//!
//! Messages without an `id` are notifications and get no response.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use super::tools::ToolRegistry;
use crate::constants::mcp;
use crate::facade::DocFacade;
use crate::types::Result;

/// JSON-RPC 2.0 Request
#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    jsonrpc: String,
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Debug, Serialize)]
struct JsonRpcResponse {
    jsonrpc: String,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 Error
#[derive(Debug, Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

// JSON-RPC error codes
const PARSE_ERROR: i32 = -32700;
const INVALID_REQUEST: i32 = -32600;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;

type MethodResult = std::result::Result<Value, (i32, String)>;

impl JsonRpcResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message }),
        }
    }
}

pub struct McpServer {
    facade: Arc<DocFacade>,
    tool_registry: ToolRegistry,
}

impl McpServer {
    pub fn new(facade: Arc<DocFacade>) -> Self {
        Self {
            facade,
            tool_registry: ToolRegistry::new(),
        }
    }

    /// Serve on the process stdin/stdout until EOF or `shutdown`
    pub async fn run(&self) -> Result<()> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.serve(reader, writer).await
    }

    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!(server = mcp::SERVER_NAME, "MCP server started on stdio");
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let (response, stop) = self.handle_message(&line).await;

            if let Some(response) = response {
                let mut payload = serde_json::to_string(&response)?;
                payload.push('\n');
                writer.write_all(payload.as_bytes()).await?;
                writer.flush().await?;
            }

            if stop {
                break;
            }
        }

        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one message; the flag asks the loop to stop
    async fn handle_message(&self, line: &str) -> (Option<JsonRpcResponse>, bool) {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "Unparseable JSON-RPC message");
                return (
                    Some(JsonRpcResponse::failure(
                        Value::Null,
                        PARSE_ERROR,
                        format!("Parse error: {}", e),
                    )),
                    false,
                );
            }
        };

        let id = request.id;

        if request.jsonrpc != "2.0" {
            let response = JsonRpcResponse::failure(
                id.unwrap_or(Value::Null),
                INVALID_REQUEST,
                "Invalid JSON-RPC version".to_string(),
            );
            return (Some(response), false);
        }

        debug!(method = %request.method, "JSON-RPC request");

        let stop = request.method == "shutdown";
        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(),
            "notifications/initialized" | "initialized" => Ok(json!({})),
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(&request.params).await,
            "shutdown" => {
                info!("Shutdown requested");
                Ok(json!({}))
            }
            _ => Err((
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        // Notifications never get a response
        let Some(id) = id else {
            return (None, stop);
        };

        let response = match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::failure(id, code, message),
        };
        (Some(response), stop)
    }

    fn handle_initialize(&self) -> MethodResult {
        Ok(json!({
            "protocolVersion": mcp::PROTOCOL_VERSION,
            "serverInfo": {
                "name": mcp::SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {}
            }
        }))
    }

    fn handle_tools_list(&self) -> MethodResult {
        Ok(json!({ "tools": self.tool_registry.list_tools() }))
    }

    async fn handle_tools_call(&self, params: &Option<Value>) -> MethodResult {
        let params = params
            .as_ref()
            .ok_or((INVALID_PARAMS, "Missing params".to_string()))?;

        let name = params
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or((INVALID_PARAMS, "Missing tool name".to_string()))?;

        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        info!(tool = name, "Calling tool");

        match self
            .tool_registry
            .call_tool(name, &arguments, &self.facade)
            .await
        {
            Ok(text) => Ok(json!({
                "content": [{
                    "type": "text",
                    "text": text
                }]
            })),
            Err(e) => Ok(json!({
                "content": [{
                    "type": "text",
                    "text": format!("Error: {}", e)
                }],
                "isError": true
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{DocumentationAgents, PlanOutput};
    use crate::pipeline::{FlowController, FlowOptions, RepositoryCloner, TopicRequest};
    use async_trait::async_trait;
    use std::path::Path;
    use tempfile::TempDir;

    struct NoAgents;

    #[async_trait]
    impl DocumentationAgents for NoAgents {
        async fn plan(&self, _repo_path: &Path) -> Result<PlanOutput> {
            Ok(PlanOutput::new(r#"{"overview": "", "topics": []}"#))
        }

        async fn generate(&self, request: &TopicRequest) -> Result<String> {
            Ok(request.title.clone())
        }
    }

    struct NoCloner;

    #[async_trait]
    impl RepositoryCloner for NoCloner {
        async fn clone_repo(&self, _url: &str, destination: &Path) -> Result<()> {
            std::fs::create_dir_all(destination)?;
            Ok(())
        }
    }

    fn server(temp: &TempDir) -> McpServer {
        let controller = FlowController::new(
            Arc::new(NoAgents),
            Arc::new(NoCloner),
            FlowOptions {
                work_dir: temp.path().join("workdir"),
                output_dir: temp.path().join("docs"),
                ..Default::default()
            },
        );
        McpServer::new(Arc::new(DocFacade::new(controller)))
    }

    async fn exchange(server: &McpServer, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        server.serve(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_initialize_and_list() {
        let temp = TempDir::new().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n"
        );

        let responses = exchange(&server(&temp), input).await;

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["result"]["protocolVersion"], "2024-11-05");
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "doc-writer");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"]["tools"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let temp = TempDir::new().unwrap();
        let input = concat!(
            "not json\n",
            r#"{"jsonrpc":"1.0","id":3,"method":"ping"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":4,"method":"resources/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":5,"method":"tools/call"}"#,
            "\n"
        );

        let responses = exchange(&server(&temp), input).await;

        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["error"]["code"], INVALID_REQUEST);
        assert_eq!(responses[2]["error"]["code"], METHOD_NOT_FOUND);
        assert_eq!(responses[3]["error"]["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_tool_failures_are_text() {
        let temp = TempDir::new().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/call","params":{"name":"view_content","arguments":{"file_path":"docs/../../etc/passwd"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"write_documentation","arguments":{"repo_url":"ftp://x"}}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"view_content","arguments":{}}}"#,
            "\n"
        );

        let responses = exchange(&server(&temp), input).await;

        let text = |i: usize| {
            responses[i]["result"]["content"][0]["text"]
                .as_str()
                .unwrap()
                .to_string()
        };
        assert!(text(0).starts_with("❌"));
        assert!(responses[0]["result"].get("isError").is_none());
        assert!(text(1).starts_with("❌"));
        assert!(text(2).contains("Missing required field: file_path"));
        assert_eq!(responses[2]["result"]["isError"], true);
    }

    #[tokio::test]
    async fn test_shutdown_stops_loop() {
        let temp = TempDir::new().unwrap();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"shutdown"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );

        let responses = exchange(&server(&temp), input).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], 1);
    }
}
