//! The static agent-tool catalog.
//!
//! Declarations only — every tool here executes entirely on the client.
//! The server's job stops at deciding which tool to ask for and
//! forwarding the request.

use conductor_domain::tool::ToolDefinition;
use serde_json::json;

/// Appended to the system directive handed to the provider on every turn.
pub const SYSTEM_DIRECTIVE: &str = "You are a voice assistant that can take action on the user's \
behalf through a small set of tools. When the user asks you to work on code, create a PR, \
analyze a repository, or run any coding task, use agent.spawn. By default set autoCreatePr and \
autoBranch to false unless the user explicitly asks. Confirm repository when unspecified; call \
repositories.list first if you don't know it.";

/// The fixed catalog of tools exposed to the LLM.
pub fn tool_catalog() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition::new(
            "agent.spawn",
            "Launch a new external coding agent against a repository or pull request.",
            json!({
                "prompt": {"type": "string", "description": "Instructions for the agent."},
                "repository": {"type": "string", "description": "owner/repo to operate on."},
                "autoCreatePr": {"type": "boolean", "description": "Open a PR when the agent finishes. Defaults to false."},
                "autoBranch": {"type": "boolean", "description": "Create a new branch for the agent's work. Defaults to false."},
            }),
            &["prompt"],
        ),
        ToolDefinition::new(
            "agent.status",
            "Query a running agent's status.",
            json!({"id": {"type": "string", "description": "The agent id returned by agent.spawn."}}),
            &["id"],
        ),
        ToolDefinition::new(
            "agent.cancel",
            "Stop a running agent.",
            json!({"id": {"type": "string", "description": "The agent id to cancel."}}),
            &["id"],
        ),
        ToolDefinition::new(
            "agent.followup",
            "Append instructions to a running agent.",
            json!({
                "id": {"type": "string", "description": "The agent id to follow up on."},
                "prompt": {"type": "string", "description": "Additional instructions."},
            }),
            &["id", "prompt"],
        ),
        ToolDefinition::new(
            "agent.list",
            "List recent agents.",
            json!({}),
            &[],
        ),
        ToolDefinition::new(
            "repositories.list",
            "List repositories the user has connected, to disambiguate names before agent.spawn.",
            json!({}),
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_six_tools_with_required_fields() {
        let catalog = tool_catalog();
        assert_eq!(catalog.len(), 6);
        let spawn = catalog.iter().find(|t| t.name == "agent.spawn").unwrap();
        assert_eq!(spawn.input_schema["required"][0], "prompt");
        let list = catalog.iter().find(|t| t.name == "agent.list").unwrap();
        assert_eq!(list.input_schema["required"].as_array().unwrap().len(), 0);
    }
}
