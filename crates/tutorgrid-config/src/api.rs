//! Remote console API configuration.
//!
//! # Environment Variables
//!
//! - `TUTORGRID_API_URL`: Base URL of the remote API (default: `http://localhost:8080/api`)
//! - `TUTORGRID_API_TOKEN`: Bearer token sent with every request (default: none)
//! - `TUTORGRID_API_TIMEOUT_SECS`: Per-request timeout in seconds (default: 30)

use std::env;
use std::time::Duration;

use crate::env_or;

#[derive(Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token: None,
            timeout_secs: 30,
        }
    }
}

impl ApiConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            base_url: env::var("TUTORGRID_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.base_url),
            token: env::var("TUTORGRID_API_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_secs: env_or("TUTORGRID_API_TIMEOUT_SECS", defaults.timeout_secs),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

// The token never reaches logs.
impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.token, None);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_url_join() {
        let config = ApiConfig::default().with_base_url("http://api.test/v1/");
        assert_eq!(config.url("/allocations"), "http://api.test/v1/allocations");
        assert_eq!(config.url("students"), "http://api.test/v1/students");
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ApiConfig::default().with_token("secret-token");
        let debug_str = format!("{:?}", config);
        assert!(debug_str.contains("ApiConfig"));
        assert!(!debug_str.contains("secret-token"));
    }

    #[test]
    fn test_zero_timeout_floors_to_one_second() {
        let config = ApiConfig {
            timeout_secs: 0,
            ..ApiConfig::default()
        };
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
