//! Selects and constructs the active [`ModelProvider`].
//!
//! There is exactly one active provider per process — just a single
//! config-driven construction point that logs clearly on failure instead
//! of panicking at startup.

use std::sync::Arc;

use conductor_domain::config::{LlmConfig, ProviderSelector};
use conductor_domain::error::Result;

use crate::anthropic::AnthropicProvider;
use crate::bedrock::BedrockProvider;
use crate::traits::ModelProvider;

pub struct ProviderRegistry {
    active: Arc<dyn ModelProvider>,
}

impl ProviderRegistry {
    /// Build the single active provider named by `config.selector`.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let active: Arc<dyn ModelProvider> = match config.selector {
            ProviderSelector::Anthropic => Arc::new(AnthropicProvider::from_config(config)?),
            ProviderSelector::Bedrock => Arc::new(BedrockProvider::new()),
        };

        tracing::info!(provider = %active.provider_id(), "LLM provider initialized");
        Ok(Self { active })
    }

    pub fn active(&self) -> Arc<dyn ModelProvider> {
        self.active.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bedrock_selector_constructs_without_credentials() {
        let cfg = LlmConfig {
            selector: ProviderSelector::Bedrock,
            ..Default::default()
        };
        let registry = ProviderRegistry::from_config(&cfg).unwrap();
        assert_eq!(registry.active().provider_id(), "bedrock");
    }

    #[test]
    fn anthropic_selector_requires_credential_env_var() {
        std::env::remove_var("CONDUCTOR_TEST_MISSING_KEY");
        let cfg = LlmConfig {
            selector: ProviderSelector::Anthropic,
            auth: conductor_domain::config::AuthConfig {
                env: "CONDUCTOR_TEST_MISSING_KEY".into(),
            },
            ..Default::default()
        };
        assert!(ProviderRegistry::from_config(&cfg).is_err());
    }
}
