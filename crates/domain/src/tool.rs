use serde::{Deserialize, Serialize};

/// A single entry in a session's conversation history.
///
/// `tool`'s `tool_use_id` must equal the `id` of a `ToolCallRequest` inside
/// an earlier `AssistantToolCalls` entry in the same history — that's the
/// correlation the provider needs to match a result to its request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Turn {
    User {
        text: String,
    },
    AssistantText {
        text: String,
    },
    AssistantToolCalls {
        calls: Vec<ToolCallRequest>,
    },
    Tool {
        tool_use_id: String,
        tool_name: String,
        content: String,
    },
    System {
        text: String,
    },
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Turn::User { text: text.into() }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Turn::AssistantText { text: text.into() }
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Turn::AssistantToolCalls { calls }
    }

    pub fn tool(
        tool_use_id: impl Into<String>,
        tool_name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Turn::Tool {
            tool_use_id: tool_use_id.into(),
            tool_name: tool_name.into(),
            content: content.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Turn::System { text: text.into() }
    }

    /// `true` for the two variants that introduce or answer a tool call —
    /// used by the session store's pair-aware truncation.
    pub fn is_tool_pair_member(&self) -> bool {
        matches!(self, Turn::AssistantToolCalls { .. } | Turn::Tool { .. })
    }
}

/// A tool call the provider asked to invoke.
///
/// `id` is provider-assigned and must round-trip bit-exact into the
/// subsequent `Turn::Tool` so the provider can correlate the result with
/// the request it made.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub input: serde_json::Value,
}

/// Tool declaration exposed to the LLM. Declarations only — execution
/// happens entirely on the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema object: `{type: "object", properties, required?}`.
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        properties: serde_json::Value,
        required: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_tool_pair_member_true_for_tool_calls_and_results() {
        let calls = Turn::assistant_tool_calls(vec![ToolCallRequest {
            id: "tu_1".into(),
            name: "repositories.list".into(),
            input: serde_json::json!({}),
        }]);
        assert!(calls.is_tool_pair_member());

        let result = Turn::tool("tu_1", "repositories.list", "{}");
        assert!(result.is_tool_pair_member());
    }

    #[test]
    fn is_tool_pair_member_false_for_text_turns() {
        assert!(!Turn::user("hello").is_tool_pair_member());
        assert!(!Turn::assistant_text("hi").is_tool_pair_member());
        assert!(!Turn::system("directive").is_tool_pair_member());
    }

    #[test]
    fn tool_definition_new_builds_object_schema() {
        let def = ToolDefinition::new(
            "agent.spawn",
            "Launch a new external coding agent",
            serde_json::json!({"prompt": {"type": "string"}}),
            &["prompt"],
        );
        assert_eq!(def.input_schema["type"], "object");
        assert_eq!(def.input_schema["required"][0], "prompt");
    }
}
