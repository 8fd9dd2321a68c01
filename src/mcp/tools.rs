//! MCP tool registry for the documentation facade.

use serde_json::{Value, json};

use crate::facade::DocFacade;
use crate::types::{DocError, Result};

/// Tool definition for MCP protocol
#[derive(Debug, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: vec![
                ToolDefinition {
                    name: "write_documentation".to_string(),
                    description: "Generate documentation for a repository URL. Clones the repository, plans the documentation and writes one .mdx page per topic.".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "required": ["repo_url"],
                        "properties": {
                            "repo_url": {
                                "type": "string",
                                "description": "http(s) URL of the repository to document"
                            }
                        }
                    }),
                },
                ToolDefinition {
                    name: "list_docs".to_string(),
                    description: "List the generated documentation files".to_string(),
                    input_schema: json!({"type": "object", "properties": {}}),
                },
                ToolDefinition {
                    name: "view_content".to_string(),
                    description: "Show the content of a generated documentation file".to_string(),
                    input_schema: json!({
                        "type": "object",
                        "required": ["file_path"],
                        "properties": {
                            "file_path": {
                                "type": "string",
                                "description": "Path of the document, e.g. 'docs/overview.mdx'"
                            }
                        }
                    }),
                },
                ToolDefinition {
                    name: "get_help".to_string(),
                    description: "Usage help for the documentation tools".to_string(),
                    input_schema: json!({"type": "object", "properties": {}}),
                },
            ],
        }
    }

    /// List all available tools in MCP format
    pub fn list_tools(&self) -> Vec<Value> {
        self.tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name. Facade results are always text; only unknown
    /// tools and missing arguments are errors.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &Value,
        facade: &DocFacade,
    ) -> Result<String> {
        match name {
            "write_documentation" => {
                let repo_url = get_required_string(arguments, "repo_url")?;
                Ok(facade.generate(&repo_url).await)
            }
            "list_docs" => Ok(facade.list()),
            "view_content" => {
                let file_path = get_required_string(arguments, "file_path")?;
                Ok(facade.view(&file_path))
            }
            "get_help" => Ok(facade.help()),
            _ => Err(DocError::invalid_input(format!("Unknown tool: {}", name))),
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn get_required_string(args: &Value, field: &str) -> Result<String> {
    args.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| DocError::invalid_input(format!("Missing required field: {}", field)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_tools() {
        let tools = ToolRegistry::new().list_tools();
        let names: Vec<_> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(
            names,
            vec!["write_documentation", "list_docs", "view_content", "get_help"]
        );
        assert_eq!(tools[0]["inputSchema"]["required"][0], "repo_url");
    }

    #[test]
    fn test_required_string() {
        let args = json!({"file_path": "docs/overview.mdx", "n": 1});
        assert_eq!(
            get_required_string(&args, "file_path").unwrap(),
            "docs/overview.mdx"
        );
        assert!(get_required_string(&args, "n").is_err());
        assert!(get_required_string(&args, "repo_url").is_err());
    }
}
