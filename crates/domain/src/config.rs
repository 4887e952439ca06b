use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub llm: LlmConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Server
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "d_port")]
    pub port: u16,
    #[serde(default = "d_host")]
    pub host: String,
    /// Hard cap on a single inbound WebSocket frame (`MAX_EVENT_BYTES`).
    #[serde(default = "d_max_event_bytes")]
    pub max_event_bytes: usize,
    /// History bound is `2 × max_turns`.
    #[serde(default = "d_max_turns")]
    pub max_turns: usize,
    /// Sliding-window admission cap per connection, per rolling 60s.
    #[serde(default = "d_rate_limit_per_minute")]
    pub rate_limit_per_minute: u32,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: d_port(),
            host: d_host(),
            max_event_bytes: d_max_event_bytes(),
            max_turns: d_max_turns(),
            rate_limit_per_minute: d_rate_limit_per_minute(),
            cors: CorsConfig::default(),
        }
    }
}

fn d_port() -> u16 {
    3210
}
fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_max_event_bytes() -> usize {
    65_536
}
fn d_max_turns() -> usize {
    20
}
fn d_rate_limit_per_minute() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CorsConfig {
    #[serde(default = "d_cors_origins")]
    pub allowed_origins: Vec<String>,
}

fn d_cors_origins() -> Vec<String> {
    vec!["*".into()]
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Switches the concrete `ModelProvider` implementation.
    #[serde(default)]
    pub selector: ProviderSelector,
    #[serde(default = "d_model_id")]
    pub model_id: String,
    /// Base token budget. Multiplied ×4 (ceiling 4096) when tools are active.
    #[serde(default = "d_max_tokens")]
    pub max_tokens: u32,
    /// Simulated-streaming cadence, in milliseconds per chunk.
    #[serde(default = "d_partial_chunk_delay_ms")]
    pub partial_chunk_delay_ms: u64,
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            selector: ProviderSelector::default(),
            model_id: d_model_id(),
            max_tokens: d_max_tokens(),
            partial_chunk_delay_ms: d_partial_chunk_delay_ms(),
            auth: AuthConfig::default(),
        }
    }
}

fn d_model_id() -> String {
    "claude-sonnet-4-5".into()
}
fn d_max_tokens() -> u32 {
    1024
}
fn d_partial_chunk_delay_ms() -> u64 {
    60
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderSelector {
    #[default]
    Anthropic,
    Bedrock,
}

impl fmt::Display for ProviderSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderSelector::Anthropic => write!(f, "anthropic"),
            ProviderSelector::Bedrock => write!(f, "bedrock"),
        }
    }
}

/// Credential resolution for the provider API.
///
/// The bearer/opaque credential is never logged; it is read once at
/// provider construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the environment variable holding the credential.
    #[serde(default = "d_auth_env")]
    pub env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { env: d_auth_env() }
    }
}

fn d_auth_env() -> String {
    "ANTHROPIC_API_KEY".into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues. An empty
    /// vec means everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.server.port == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be greater than 0".into(),
            });
        }
        if self.server.host.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.host".into(),
                message: "host must not be empty".into(),
            });
        }
        if self.server.max_event_bytes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.max_event_bytes".into(),
                message: "max_event_bytes must be greater than 0".into(),
            });
        }
        if self.server.max_turns == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "server.max_turns".into(),
                message: "max_turns must be greater than 0".into(),
            });
        }
        if self.server.rate_limit_per_minute == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.rate_limit_per_minute".into(),
                message: "rate_limit_per_minute is 0 — every inbound event will be rejected".into(),
            });
        }
        if self.server.cors.allowed_origins.len() == 1 && self.server.cors.allowed_origins[0] == "*"
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "server.cors.allowed_origins".into(),
                message: "wildcard \"*\" allows all origins (not recommended for production)"
                    .into(),
            });
        }
        if self.llm.model_id.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.model_id".into(),
                message: "model_id must not be empty".into(),
            });
        }
        if self.llm.max_tokens == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.max_tokens".into(),
                message: "max_tokens must be greater than 0".into(),
            });
        }
        if self.llm.auth.env.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.auth.env".into(),
                message: "auth.env must name an environment variable".into(),
            });
        } else if std::env::var(&self.llm.auth.env).is_err() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.auth.env".into(),
                message: format!(
                    "environment variable \"{}\" is not set — provider calls will fail",
                    self.llm.auth.env
                ),
            });
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_shape_checks() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 3210);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.max_turns, 20);
        assert_eq!(cfg.llm.selector, ProviderSelector::Anthropic);
    }

    #[test]
    fn zero_port_is_error() {
        let mut cfg = Config::default();
        cfg.server.port = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "server.port" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn empty_max_tokens_is_error() {
        let mut cfg = Config::default();
        cfg.llm.max_tokens = 0;
        let issues = cfg.validate();
        assert!(issues
            .iter()
            .any(|e| e.field == "llm.max_tokens" && e.severity == ConfigSeverity::Error));
    }

    #[test]
    fn cors_wildcard_is_warning() {
        let cfg = Config::default();
        let issues = cfg.validate();
        let issue = issues
            .iter()
            .find(|e| e.field == "server.cors.allowed_origins")
            .expect("expected CORS wildcard warning");
        assert_eq!(issue.severity, ConfigSeverity::Warning);
    }

    #[test]
    fn provider_selector_roundtrips_through_toml() {
        let toml_str = "[llm]\nselector = \"bedrock\"\n";
        let cfg: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(cfg.llm.selector, ProviderSelector::Bedrock);
    }
}
