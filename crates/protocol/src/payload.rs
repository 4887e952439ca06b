//! Typed payload shapes for each envelope `type` in the closed set.
//!
//! These are convenience views over `Envelope::payload` — callers still go
//! through `serde_json::from_value`/`to_value`, the envelope itself stays
//! payload-agnostic. Wire field names are camelCase.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStart {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStarted {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTranscriptFinal {
    pub text: String,
}

/// `text` is the cumulative prefix emitted so far, not a delta.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSpeechPartial {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantSpeechFinal {
    pub text: String,
}

/// `arguments` is a JSON-encoded string of the tool input, not an object,
/// to align with the client's router contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: String,
}

/// Exactly one of `result`, `error` is non-null. `result` is a JSON-encoded
/// string when present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub call_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCompleted {
    pub agent_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioOutputInterrupted {
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_round_trips_with_only_one_of_result_error() {
        let tr = ToolResult {
            call_id: "c1".into(),
            result: Some("{\"ok\":true}".into()),
            error: None,
        };
        let v = serde_json::to_value(&tr).unwrap();
        assert!(v.get("error").is_none());
        assert_eq!(v.get("callId").unwrap(), "c1");
        let back: ToolResult = serde_json::from_value(v).unwrap();
        assert_eq!(back.call_id, "c1");
        assert_eq!(back.error, None);
    }

    #[test]
    fn session_start_uses_camel_case_wire_fields() {
        let parsed: SessionStart =
            serde_json::from_value(serde_json::json!({"sessionId": "s1"})).unwrap();
        assert_eq!(parsed.session_id, "s1");
        assert!(parsed.github_token.is_none());
    }
}
