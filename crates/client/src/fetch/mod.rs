//! HTTP fetch pipeline used as the worker's network.
//!
//! ### URL Canonicalization
//! - Trim whitespace, ensure scheme (default: `https`)
//! - Resolve root-relative paths against the site origin
//! - Lowercase host, remove fragments, preserve query string
//!
//! ### Limits
//! - Every request is bounded by the configured timeout (default 20s);
//!   a timeout is reported like any other network failure.
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//!
//! Non-2xx statuses are returned as responses. Only failures that leave the
//! caller without a response are errors.

pub mod request;
pub mod response;
pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};

pub use request::Request;
pub use response::Response;
pub use url::{UrlError, canonicalize, resolve};

use offcache_core::{AppConfig, Error};

/// Anything that can turn a request into a response.
///
/// The worker only ever talks to the network through this trait.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "offcache/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "offcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Default::default()
        }
    }
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn map_send_error(&self, url: &reqwest::Url, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::FetchTimeout(format!("{} after {}ms", url, self.config.timeout.as_millis()))
        } else {
            Error::Network(format!("{}: {}", url, err))
        }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| self.map_send_error(&request.url, e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.map_send_error(&request.url, e))?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(
            url = %request.url,
            final_url = %final_url,
            status = status.as_u16(),
            bytes = bytes.len(),
            fetch_ms = start.elapsed().as_millis() as u64,
            "fetched"
        );

        Ok(Response::new(final_url, status, headers, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "offcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { timeout_ms: 1500, max_bytes: 1024, user_agent: "test/1".into(), ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.timeout, Duration::from_millis(1500));
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.user_agent, "test/1");
        assert_eq!(config.max_redirects, 5);
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() })
            .unwrap();
        let url = reqwest::Url::parse("http://127.0.0.1:9/").unwrap();

        let err = client.fetch(&Request::get(url)).await.unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = reqwest::Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(200), ..Default::default() })
            .unwrap();

        let err = client.fetch(&Request::get(url)).await.unwrap_err();
        assert!(matches!(err, Error::FetchTimeout(_)), "got {err:?}");
        assert!(err.is_network());
        drop(listener);
    }
}
