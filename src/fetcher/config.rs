//! # Fetcher Configuration Module
//!
//! Configuration for the page fetcher. Like the other configs in this crate it
//! comes with a builder so callers only spell out what they change.
//!
//! ## Key Components
//!
//! - `FetcherConfig`: timeout, user agent, body limit and host allow-list
//! - `FetcherConfigBuilder`: builder pattern implementation for easier configuration

use std::time::Duration;

/// Default request timeout in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default cap on the number of body bytes read from a response
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Configuration for the fetcher
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Total time allowed for a request, including reading the body
    pub timeout: Duration,

    /// User agent to use for requests
    pub user_agent: String,

    /// Bodies longer than this are truncated
    pub max_body_bytes: usize,

    /// Hosts that may be fetched. Empty means any host.
    ///
    /// An entry also admits its subdomains, so `example.com` allows
    /// `www.example.com`.
    pub allowed_hosts: Vec<String>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("linkpost/{}", env!("CARGO_PKG_VERSION")),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            allowed_hosts: Vec::new(),
        }
    }
}

impl FetcherConfig {
    /// Create a new builder
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Whether `host` passes the allow-list
    pub fn is_host_allowed(&self, host: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let host = host.to_ascii_lowercase();
        self.allowed_hosts.iter().any(|allowed| {
            let allowed = allowed.trim().trim_end_matches('.').to_ascii_lowercase();
            host == allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }
}

/// Builder for FetcherConfig
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: FetcherConfig::default(),
        }
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the user agent to use for requests
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the maximum number of body bytes to keep
    pub fn max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.config.max_body_bytes = max_body_bytes;
        self
    }

    /// Restrict fetching to the given hosts
    pub fn allowed_hosts(mut self, allowed_hosts: Vec<String>) -> Self {
        self.config.allowed_hosts = allowed_hosts;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FetcherConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetcherConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.user_agent.starts_with("linkpost/"));
        assert!(config.allowed_hosts.is_empty());
    }

    #[test]
    fn test_builder() {
        let config = FetcherConfig::builder()
            .timeout(Duration::from_millis(250))
            .user_agent("test-agent")
            .max_body_bytes(64)
            .build();

        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.max_body_bytes, 64);
    }

    #[test]
    fn test_allow_list() {
        let open = FetcherConfig::default();
        assert!(open.is_host_allowed("anything.invalid"));

        let config = FetcherConfig::builder()
            .allowed_hosts(vec!["example.com".to_string()])
            .build();
        assert!(config.is_host_allowed("example.com"));
        assert!(config.is_host_allowed("www.Example.com"));
        assert!(!config.is_host_allowed("badexample.com"));
        assert!(!config.is_host_allowed("example.org"));
    }
}
