//! Gateway configuration.
//!
//! Built with builder methods, or read from the environment:
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `ICN_API_URL` | Node base URL | `http://localhost:8080` |
//! | `ICN_API_KEY` | Sent as `x-api-key` | unset |
//! | `ICN_BEARER_TOKEN` | Sent as `Authorization: Bearer` | unset |
//! | `ICN_API_TIMEOUT_MS` | Per-request deadline | none |
//! | `ICN_ENABLE_SSE` | Try push transport first | `true` |

use std::time::Duration;

use crate::gateway::Credentials;

/// Default node URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Configuration for a [`GatewayClient`](crate::gateway::GatewayClient).
///
/// # Example
///
/// ```
/// use icn_realtime::config::GatewayConfig;
/// use std::time::Duration;
///
/// let config = GatewayConfig::new("http://node:8080/")
///     .with_api_key("k")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.base_url, "http://node:8080");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Base URL without trailing slash
    pub base_url: String,
    /// Initial credentials
    pub credentials: Credentials,
    /// Per-request deadline; `None` waits indefinitely
    pub timeout: Option<Duration>,
    /// Whether realtime subscriptions try the push transport first
    pub enable_sse: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl GatewayConfig {
    /// Create a config for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: normalize_base_url(&base_url.into()),
            credentials: Credentials::default(),
            timeout: None,
            enable_sse: true,
        }
    }

    /// Read configuration from `ICN_*` environment variables.
    ///
    /// Malformed numeric or boolean values are logged and ignored.
    pub fn from_env() -> Self {
        let base_url = non_empty_var("ICN_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(base_url);

        if let Some(key) = non_empty_var("ICN_API_KEY") {
            config = config.with_api_key(key);
        }
        if let Some(token) = non_empty_var("ICN_BEARER_TOKEN") {
            config = config.with_bearer_token(token);
        }
        if let Some(raw) = non_empty_var("ICN_API_TIMEOUT_MS") {
            match raw.parse::<u64>() {
                Ok(ms) if ms > 0 => config = config.with_timeout(Duration::from_millis(ms)),
                Ok(_) => {}
                Err(e) => tracing::warn!("Ignoring ICN_API_TIMEOUT_MS={:?}: {}", raw, e),
            }
        }
        if let Some(raw) = non_empty_var("ICN_ENABLE_SSE") {
            match parse_bool(&raw) {
                Some(enabled) => config.enable_sse = enabled,
                None => tracing::warn!("Ignoring ICN_ENABLE_SSE={:?}: expected a boolean", raw),
            }
        }

        config
    }

    /// Replace the base URL, keeping everything else.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = normalize_base_url(&base_url.into());
        self
    }

    /// Set the API key sent as `x-api-key`.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials.api_key = Some(key.into());
        self
    }

    /// Set the bearer token sent in `Authorization`.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.credentials.bearer_token = Some(token.into());
        self
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set whether push transport is attempted.
    pub fn with_enable_sse(mut self, enable: bool) -> Self {
        self.enable_sse = enable;
        self
    }
}

fn normalize_base_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for name in [
            "ICN_API_URL",
            "ICN_API_KEY",
            "ICN_BEARER_TOKEN",
            "ICN_API_TIMEOUT_MS",
            "ICN_ENABLE_SSE",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout.is_none());
        assert!(config.enable_sse);
        assert_eq!(config.credentials, Credentials::default());
    }

    #[test]
    fn test_trailing_slash_removed() {
        assert_eq!(GatewayConfig::new("http://a:1///").base_url, "http://a:1");
    }

    #[test]
    fn test_builder_methods() {
        let config = GatewayConfig::new("http://a")
            .with_api_key("key")
            .with_bearer_token("tok")
            .with_timeout(Duration::from_millis(250))
            .with_enable_sse(false);
        assert_eq!(config.credentials.api_key.as_deref(), Some("key"));
        assert_eq!(config.credentials.bearer_token.as_deref(), Some("tok"));
        assert_eq!(config.timeout, Some(Duration::from_millis(250)));
        assert!(!config.enable_sse);
    }

    #[test]
    #[serial]
    fn test_from_env_reads_variables() {
        clear_env();
        std::env::set_var("ICN_API_URL", "http://node:9000/");
        std::env::set_var("ICN_API_KEY", "secret");
        std::env::set_var("ICN_API_TIMEOUT_MS", "1500");
        std::env::set_var("ICN_ENABLE_SSE", "off");

        let config = GatewayConfig::from_env();
        clear_env();

        assert_eq!(config.base_url, "http://node:9000");
        assert_eq!(config.credentials.api_key.as_deref(), Some("secret"));
        assert!(config.credentials.bearer_token.is_none());
        assert_eq!(config.timeout, Some(Duration::from_millis(1500)));
        assert!(!config.enable_sse);
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_malformed_values() {
        clear_env();
        std::env::set_var("ICN_API_TIMEOUT_MS", "soon");
        std::env::set_var("ICN_ENABLE_SSE", "maybe");

        let config = GatewayConfig::from_env();
        clear_env();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(config.timeout.is_none());
        assert!(config.enable_sse);
    }
}
