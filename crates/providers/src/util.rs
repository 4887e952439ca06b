//! Shared utility functions for provider adapters.

use conductor_domain::config::AuthConfig;
use conductor_domain::error::{Error, Result};

/// Convert a [`reqwest::Error`] into the domain [`Error`] type.
///
/// Timeout errors map to [`Error::Timeout`]; everything else maps to
/// [`Error::Http`].
pub(crate) fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Resolve the provider credential: read the environment variable named by
/// `auth.env`. The value is never logged.
pub fn resolve_api_key(auth: &AuthConfig) -> Result<String> {
    std::env::var(&auth.env).map_err(|_| {
        Error::Config(format!(
            "environment variable \"{}\" not set or not valid UTF-8",
            auth.env
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_api_key_env_var() {
        let var_name = "CONDUCTOR_TEST_RESOLVE_ENV_KEY_1234";
        std::env::set_var(var_name, "env-secret-value");
        let auth = AuthConfig {
            env: var_name.into(),
        };
        let result = resolve_api_key(&auth).unwrap();
        assert_eq!(result, "env-secret-value");
        std::env::remove_var(var_name);
    }

    #[test]
    fn resolve_api_key_env_var_missing() {
        let auth = AuthConfig {
            env: "CONDUCTOR_TEST_NONEXISTENT_VAR_8888".into(),
        };
        let err = resolve_api_key(&auth).unwrap_err();
        assert!(err.to_string().contains("CONDUCTOR_TEST_NONEXISTENT_VAR_8888"));
    }
}
