//! Prompt templates for the planning and writing agents.

use serde_json::{Value, json};

use crate::pipeline::TopicRequest;

/// JSON schema of the planning result
pub fn plan_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "overview": {
                "type": "string",
                "description": "Summary of the whole repository: purpose, architecture, main components"
            },
            "docs": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "prerequisites": {"type": "string"},
                        "examples": {"type": "array", "items": {"type": "string"}},
                        "goal": {"type": "string"}
                    },
                    "required": ["title", "description", "prerequisites", "examples", "goal"]
                }
            }
        },
        "required": ["overview", "docs"]
    })
}

pub fn planning_prompt(snapshot: &str) -> String {
    format!(
        r#"You are a senior technical writer planning the documentation of a software repository.

Study the repository below and produce a documentation plan:
- "overview": a concise description of what the project does, how it is structured, and who uses it.
- "docs": an ordered list of documentation pages. Start with an introduction or getting-started page,
  then cover core concepts, main components, configuration and usage. Each page has a short "title",
  a "description" of its scope, the "prerequisites" a reader needs, a list of concrete "examples"
  to include, and the "goal" the reader reaches after reading it.

Only plan pages the repository actually supports. Keep titles short and distinct.

<repository>
{snapshot}
</repository>"#
    )
}

pub fn writing_prompt(request: &TopicRequest, snapshot: &str) -> String {
    format!(
        r#"You are a senior technical writer. Write one documentation page in MDX for the repository below.

# Repository overview
{overview}

# Page
Title: {title}
Description: {description}
Prerequisites: {prerequisites}
Goal: {goal}
Examples to include:
{examples}

Requirements:
- Start with a level-one heading equal to the title.
- Ground every statement and code sample in the repository contents; do not invent APIs.
- Use fenced code blocks with a language tag for examples.
- Output only the page content, without surrounding commentary.

<repository path="{path}">
{snapshot}
</repository>"#,
        overview = request.overview,
        title = request.title,
        description = request.description,
        prerequisites = request.prerequisites,
        goal = request.goal,
        examples = request.examples,
        path = request.repo_path.display(),
    )
}
