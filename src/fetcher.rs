//! # Page Fetcher Module
//!
//! Retrieves the raw HTML of the page a record links to. This is the only part
//! of an import that touches the network, so it is the only part that carries
//! a timeout.
//!
//! ## Key Components
//!
//! - `Fetcher`: validates a source URL and issues a single GET for it
//! - `FetcherConfig`: timeout, user agent, body limit and host allow-list
//! - `FetchError`: typed failure for every way a fetch can go wrong
//!
//! ## Behaviour
//!
//! - Only absolute `http`/`https` URLs are fetched
//! - Non-success statuses are failures, the body is discarded
//! - No retries are made; wrap `Fetcher::fetch` if you need them
//! - Bodies are capped at `max_body_bytes` and decoded lossily as UTF-8

mod config;
mod error;

pub use config::{FetcherConfig, FetcherConfigBuilder};
pub use error::FetchError;

use reqwest::Client;
use reqwest::redirect::Policy;
use tracing::{debug, instrument, warn};
use url::Url;

/// Raw response body of a fetched page
pub type Body = String;

/// Maximum number of redirects followed for a single fetch
const MAX_REDIRECTS: usize = 10;

/// HTTP client for retrieving source pages
#[derive(Debug, Clone)]
pub struct Fetcher {
    /// The underlying reqwest client
    client: Client,

    /// Configuration the client was built from
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let redirect_config = config.clone();
        let redirect_policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if attempt
                .url()
                .host_str()
                .is_some_and(|host| redirect_config.is_host_allowed(host))
            {
                attempt.follow()
            } else {
                attempt.stop()
            }
        });

        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .redirect(redirect_policy)
            .build()
            .map_err(FetchError::Network)?;

        Ok(Self { client, config })
    }

    /// The configuration this fetcher was built with
    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Check that `url` is something this fetcher is willing to request
    pub fn validate(&self, url: &str) -> Result<Url, FetchError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(FetchError::InvalidUrl("empty URL".to_string()));
        }

        let parsed = Url::parse(trimmed)?;
        match parsed.scheme() {
            "http" | "https" => {}
            other => return Err(FetchError::UnsupportedScheme(other.to_string())),
        }

        let host = parsed
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("{} has no host", trimmed)))?;
        if !self.config.is_host_allowed(host) {
            return Err(FetchError::HostNotAllowed(host.to_string()));
        }

        Ok(parsed)
    }

    /// Fetch a page and return its body as text
    ///
    /// # Arguments
    ///
    /// * `url` - Absolute http(s) URL of the page
    ///
    /// # Returns
    ///
    /// The response body, truncated to `max_body_bytes`
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch(&self, url: &str) -> Result<Body, FetchError> {
        let url = self.validate(url)?;

        debug!("Sending GET request to {}", url);
        let mut response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fetching {} returned {}", url, status);
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let limit = self.config.max_body_bytes;
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            let remaining = limit.saturating_sub(body.len());
            if chunk.len() > remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!("Truncated body of {} at {} bytes", url, limit);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;
    use std::time::Duration;

    fn fetcher() -> Fetcher {
        Fetcher::new(FetcherConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/page")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><head><title>Hi</title></head></html>")
            .expect(1)
            .create_async()
            .await;

        let body = fetcher()
            .fetch(&format!("{}/page", server.url()))
            .await
            .unwrap();
        assert!(body.contains("<title>Hi</title>"));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_http_status() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("GET", "/broken")
            .with_status(500)
            .with_body("Internal Server Error")
            .create_async()
            .await;

        let result = fetcher()
            .fetch(&format!("{}/broken", server.url()))
            .await;
        assert!(matches!(result, Err(FetchError::HttpStatus(500))));

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_truncates_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/big")
            .with_status(200)
            .with_body("x".repeat(1000))
            .create_async()
            .await;

        let fetcher = Fetcher::new(FetcherConfig::builder().max_body_bytes(16).build()).unwrap();
        let body = fetcher
            .fetch(&format!("{}/big", server.url()))
            .await
            .unwrap();
        assert_eq!(body.len(), 16);
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection and never answer.
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let fetcher = Fetcher::new(
            FetcherConfig::builder()
                .timeout(Duration::from_millis(200))
                .build(),
        )
        .unwrap();
        let result = fetcher.fetch(&format!("http://{}/slow", addr)).await;
        assert!(matches!(result, Err(FetchError::Timeout)));
    }

    #[tokio::test]
    async fn test_fetch_rejects_bad_urls() {
        let fetcher = fetcher();

        assert!(matches!(
            fetcher.fetch("").await,
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch("not a url").await,
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch("/relative/path").await,
            Err(FetchError::InvalidUrl(_))
        ));
        assert!(matches!(
            fetcher.fetch("ftp://example.com/file").await,
            Err(FetchError::UnsupportedScheme(scheme)) if scheme == "ftp"
        ));
    }

    #[tokio::test]
    async fn test_fetch_respects_allow_list() {
        let fetcher = Fetcher::new(
            FetcherConfig::builder()
                .allowed_hosts(vec!["example.com".to_string()])
                .build(),
        )
        .unwrap();

        let result = fetcher.fetch("http://127.0.0.1:1/").await;
        assert!(matches!(result, Err(FetchError::HostNotAllowed(host)) if host == "127.0.0.1"));
    }
}
