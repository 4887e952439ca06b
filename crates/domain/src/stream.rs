use std::pin::Pin;

use crate::tool::ToolCallRequest;

/// A boxed async stream, used for the provider's simulated-streaming chunk
/// sequence.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// The result of asking a [`crate::config::Config`]-selected provider to
/// continue a conversation.
///
/// Exactly one of `{chunks non-empty, tool_calls non-empty}` is populated
/// per response: a tool-use response carries an empty `chunks` stream and a
/// non-empty `tool_calls`; a text response carries a non-empty `chunks` and
/// an empty `tool_calls`.
pub struct ModelResponse {
    /// The complete assistant text. Empty when the response is a tool-use.
    pub full_text: String,
    /// A lazy, finite, non-restartable sequence of text fragments that,
    /// concatenated in order, equal `full_text`.
    pub chunks: BoxStream<'static, String>,
    /// Non-empty iff the provider chose to invoke tools instead of
    /// responding with text.
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelResponse {
    /// Build a tool-use response: no text, no chunks.
    pub fn tool_use(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self {
            full_text: String::new(),
            chunks: Box::pin(futures_util::stream::empty()),
            tool_calls,
        }
    }
}
