use conductor_domain::error::Result;
use conductor_domain::stream::ModelResponse;
use conductor_domain::tool::{ToolDefinition, Turn};

/// Turns a conversation plus tool declarations into either streamed text or
/// a set of tool-use requests.
///
/// Implementations are provider-specific adapters that translate between
/// [`Turn`]/[`ToolDefinition`] and the wire format of the concrete LLM API.
#[async_trait::async_trait]
pub trait ModelProvider: Send + Sync {
    /// Generate the next step of the conversation.
    ///
    /// Exactly one of `{chunks/full_text non-empty, tool_calls non-empty}`
    /// is populated in the returned [`ModelResponse`]. Failures surface as
    /// `Error::Provider`.
    async fn respond(&self, history: &[Turn], tools: &[ToolDefinition]) -> Result<ModelResponse>;

    /// A unique identifier for this provider instance (used in logs and
    /// error messages).
    fn provider_id(&self) -> &str;
}
