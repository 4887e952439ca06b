//! Anthropic-style tool-use provider.
//!
//! Builds a provider-native request from the internal [`Turn`] history,
//! parses text and `tool_use` blocks out of the response, and — because
//! this layer fetches the full response before returning anything —
//! simulates streaming by handing back successive fragments through
//! [`conductor_domain::stream::ModelResponse::chunks`] on a small delay.
//! A genuinely streaming provider would implement the same `chunks`
//! iterable against the upstream SSE stream instead; nothing downstream
//! would need to change.

use std::time::Duration;

use conductor_domain::config::LlmConfig;
use conductor_domain::error::{Error, Result};
use conductor_domain::stream::ModelResponse;
use conductor_domain::tool::{ToolCallRequest, ToolDefinition, Turn};
use serde_json::{json, Value};

use crate::traits::ModelProvider;
use crate::util::{from_reqwest, resolve_api_key};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
/// Wall-clock cap on the upstream request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Ceiling on the tool-active token budget multiplier.
const TOOL_MAX_TOKENS_CEILING: u32 = 4096;

pub struct AnthropicProvider {
    id: String,
    base_url: String,
    api_key: String,
    model_id: String,
    max_tokens: u32,
    partial_chunk_delay_ms: u64,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn from_config(cfg: &LlmConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            id: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key,
            model_id: cfg.model_id.clone(),
            max_tokens: cfg.max_tokens,
            partial_chunk_delay_ms: cfg.partial_chunk_delay_ms,
            client,
        })
    }

    /// Split the system directive off the head of `history` and map every
    /// remaining [`Turn`] into a provider-native message.
    fn build_request_body(&self, history: &[Turn], tools: &[ToolDefinition]) -> Value {
        let mut system: Option<String> = None;
        let mut messages = Vec::with_capacity(history.len());

        for turn in history {
            match turn {
                Turn::System { text } => {
                    // "may exist only as the first element" — a single
                    // directive, placed once at the head.
                    system.get_or_insert_with(|| text.clone());
                }
                Turn::User { text } => {
                    messages.push(json!({"role": "user", "content": text}));
                }
                Turn::AssistantText { text } => {
                    messages.push(json!({"role": "assistant", "content": text}));
                }
                Turn::AssistantToolCalls { calls } => {
                    let content: Vec<Value> = calls
                        .iter()
                        .map(|c| {
                            json!({
                                "type": "tool_use",
                                "id": c.id,
                                "name": c.name,
                                "input": c.input,
                            })
                        })
                        .collect();
                    messages.push(json!({"role": "assistant", "content": content}));
                }
                Turn::Tool {
                    tool_use_id,
                    content,
                    ..
                } => {
                    // Deliberately wrapped under a `user` role.
                    messages.push(json!({
                        "role": "user",
                        "content": [{
                            "type": "tool_result",
                            "tool_use_id": tool_use_id,
                            "content": content,
                        }],
                    }));
                }
            }
        }

        let max_tokens = if tools.is_empty() {
            self.max_tokens
        } else {
            (self.max_tokens.saturating_mul(4)).min(TOOL_MAX_TOKENS_CEILING)
        };

        let mut body = json!({
            "model": self.model_id,
            "max_tokens": max_tokens,
            "messages": messages,
        });
        if let Some(system) = system {
            body["system"] = Value::String(system);
        }
        if !tools.is_empty() {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.input_schema,
                    })
                })
                .collect();
            body["tools"] = Value::Array(tool_defs);
        }

        body
    }

    /// Walk the `content` blocks of a Messages-API response, building the
    /// concatenated text and the list of requested tool calls.
    fn parse_response(&self, body: &Value) -> Result<(String, Vec<ToolCallRequest>)> {
        let blocks = body
            .get("content")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::Provider {
                provider: self.id.clone(),
                message: "response missing \"content\" array".into(),
            })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();

        for block in blocks {
            match block.get("type").and_then(Value::as_str) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(Value::as_str) {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => {
                    let id = block
                        .get("id")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let name = block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    let input = block.get("input").cloned().unwrap_or(json!({}));
                    tool_calls.push(ToolCallRequest { id, name, input });
                }
                _ => {}
            }
        }

        Ok((text, tool_calls))
    }

    fn chunked_response(&self, full_text: String) -> ModelResponse {
        let delay = Duration::from_millis(self.partial_chunk_delay_ms);
        let fragments = chunk_text(&full_text);
        let chunks = async_stream::stream! {
            for fragment in fragments {
                tokio::time::sleep(delay).await;
                yield fragment;
            }
        };
        ModelResponse {
            full_text,
            chunks: Box::pin(chunks),
            tool_calls: Vec::new(),
        }
    }
}

#[async_trait::async_trait]
impl ModelProvider for AnthropicProvider {
    async fn respond(&self, history: &[Turn], tools: &[ToolDefinition]) -> Result<ModelResponse> {
        let body = self.build_request_body(history, tools);
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            if status.as_u16() == 429 {
                tracing::warn!(provider = %self.id, "rate limited by provider");
            }
            return Err(Error::Provider {
                provider: self.id.clone(),
                message: format!("HTTP {status}: {text}"),
            });
        }

        let parsed: Value = response.json().await.map_err(from_reqwest)?;
        let (full_text, tool_calls) = self.parse_response(&parsed)?;

        if !tool_calls.is_empty() {
            Ok(ModelResponse::tool_use(tool_calls))
        } else {
            Ok(self.chunked_response(full_text))
        }
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

/// Break `text` into small fragments for the simulated-streaming chunk
/// sequence, splitting on word boundaries so no fragment splits a word.
fn chunk_text(text: &str) -> Vec<String> {
    const WORDS_PER_CHUNK: usize = 3;

    if text.is_empty() {
        return Vec::new();
    }
    let words: Vec<&str> = text.split(' ').collect();
    if words.len() <= 1 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let end = (i + WORDS_PER_CHUNK).min(words.len());
        let mut piece = words[i..end].join(" ");
        if end < words.len() {
            piece.push(' ');
        }
        chunks.push(piece);
        i = end;
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_text_concatenates_back_to_original() {
        let text = "Hi, how can I help you today?";
        let chunks = chunk_text(text);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn chunk_text_empty_yields_no_fragments() {
        assert!(chunk_text("").is_empty());
    }

    fn test_provider() -> AnthropicProvider {
        AnthropicProvider {
            id: "anthropic".into(),
            base_url: DEFAULT_BASE_URL.into(),
            api_key: "sk-test".into(),
            model_id: "claude-sonnet-4-5".into(),
            max_tokens: 100,
            partial_chunk_delay_ms: 1,
            client: reqwest::Client::new(),
        }
    }

    #[test]
    fn build_request_body_separates_system_and_maps_tool_pairs() {
        let provider = test_provider();
        let history = vec![
            Turn::system("directive"),
            Turn::user("list my repos"),
            Turn::assistant_tool_calls(vec![ToolCallRequest {
                id: "tu_1".into(),
                name: "repositories.list".into(),
                input: serde_json::json!({}),
            }]),
            Turn::tool("tu_1", "repositories.list", "{\"repositories\":[]}"),
        ];
        let tools = vec![ToolDefinition::new(
            "repositories.list",
            "List repositories",
            serde_json::json!({}),
            &[],
        )];

        let body = provider.build_request_body(&history, &tools);
        assert_eq!(body["system"], "directive");
        assert_eq!(body["messages"].as_array().unwrap().len(), 3);
        assert_eq!(body["messages"][1]["content"][0]["type"], "tool_use");
        assert_eq!(body["messages"][2]["role"], "user");
        assert_eq!(body["messages"][2]["content"][0]["type"], "tool_result");
        // Tool budget raised to min(configured*4, 4096).
        assert_eq!(body["max_tokens"], 400);
    }

    #[test]
    fn build_request_body_without_tools_uses_configured_budget() {
        let provider = test_provider();
        let history = vec![Turn::user("hello")];
        let body = provider.build_request_body(&history, &[]);
        assert_eq!(body["max_tokens"], 100);
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn parse_response_extracts_both_text_and_tool_use() {
        let provider = test_provider();
        let body = serde_json::json!({
            "content": [
                {"type": "text", "text": "checking on that"},
                {"type": "tool_use", "id": "tu_1", "name": "agent.status", "input": {"id": "a1"}},
            ]
        });
        let (text, calls) = provider.parse_response(&body).unwrap();
        assert_eq!(text, "checking on that");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "agent.status");
    }

    #[test]
    fn parse_response_missing_content_is_provider_error() {
        let provider = test_provider();
        let err = provider.parse_response(&serde_json::json!({})).unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
