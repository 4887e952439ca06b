use std::sync::Arc;

use conductor_domain::config::Config;
use conductor_domain::tool::ToolDefinition;
use conductor_providers::ProviderRegistry;
use conductor_sessions::SessionStore;

use crate::catalog;

/// Shared application state passed to every connection handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionStore>,
    pub llm: Arc<ProviderRegistry>,
    /// Static agent-tool catalog, built once at startup.
    pub tools: Arc<Vec<ToolDefinition>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, llm: Arc<ProviderRegistry>) -> Self {
        let sessions = Arc::new(SessionStore::new(
            config.server.max_turns,
            config.server.rate_limit_per_minute,
        ));
        Self {
            config,
            sessions,
            llm,
            tools: Arc::new(catalog::tool_catalog()),
        }
    }
}
