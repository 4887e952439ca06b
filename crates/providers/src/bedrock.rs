//! AWS Bedrock stub adapter.
//!
//! Native Bedrock SigV4 authentication requires the `aws-sigv4` and
//! `aws-credential-types` crates, which add significant dependency weight
//! for a provider kind this system does not actually exercise. The stub
//! registers successfully so `provider selector = "bedrock"` passes
//! config validation and round-trips through TOML, but every operational
//! call returns a `providerError` pointing at Bedrock's OpenAI-compatible
//! gateway instead.

use conductor_domain::error::{Error, Result};
use conductor_domain::stream::ModelResponse;
use conductor_domain::tool::{ToolDefinition, Turn};

use crate::traits::ModelProvider;

const STUB_MSG: &str = "\
AWS Bedrock native SigV4 auth is not implemented (would require the \
aws-sdk-bedrockruntime crate). Use Bedrock's OpenAI-compatible endpoint \
instead and configure IAM credentials externally.";

pub struct BedrockProvider {
    id: String,
}

impl BedrockProvider {
    /// Always succeeds so the provider appears selectable, but every
    /// operational method below returns [`STUB_MSG`].
    pub fn new() -> Self {
        tracing::warn!(
            "bedrock provider registered as a stub — native SigV4 auth not implemented"
        );
        Self {
            id: "bedrock".into(),
        }
    }
}

impl Default for BedrockProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ModelProvider for BedrockProvider {
    async fn respond(&self, _history: &[Turn], _tools: &[ToolDefinition]) -> Result<ModelResponse> {
        Err(Error::Provider {
            provider: self.id.clone(),
            message: STUB_MSG.into(),
        })
    }

    fn provider_id(&self) -> &str {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn respond_always_errors() {
        let provider = BedrockProvider::new();
        let err = provider.respond(&[], &[]).await.unwrap_err();
        assert!(matches!(err, Error::Provider { .. }));
    }
}
