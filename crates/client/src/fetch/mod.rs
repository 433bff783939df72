//! Network layer of the worker.
//!
//! ### Contract
//! - [`Network::fetch`] resolves with a [`Response`] for every HTTP status;
//!   deciding what a non-2xx status means is up to the caching policy.
//! - Transport failures (DNS, refused connection, reset, client timeout) are
//!   errors.
//!
//! ### Limits
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)

pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::time::{Duration, Instant};

pub use url::{UrlError, resolve};

use swcache_core::{AppConfig, Error, Request, Response};

/// Source of network responses for the worker.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "swcache/0.1")
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
            user_agent: "swcache/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
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
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn build_response(&self, status: u16, final_url: String, headers: &header::HeaderMap, bytes: Bytes) -> Response {
        let mut response = Response::new(final_url, status, bytes.to_vec());
        for (name, value) in headers {
            if let Ok(value) = value.to_str() {
                response = response.with_header(name.as_str(), value);
            }
        }
        response
    }
}

/// Size check, compared in u64.
fn exceeds_limit(len: u64, max_bytes: usize) -> bool {
    len > max_bytes as u64
}

fn transport_error(err: reqwest::Error) -> Error {
    if err.is_timeout() { Error::FetchTimeout(err.to_string()) } else { Error::Network(err.to_string()) }
}

#[async_trait]
impl Network for FetchClient {
    /// Fetch a request, returning its body and headers whatever the status.
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let method = reqwest::Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(transport_error)?;

        if let Some(len) = response.content_length()
            && exceeds_limit(len, self.config.max_bytes)
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(transport_error)?;

        if exceeds_limit(bytes.len() as u64, self.config.max_bytes) {
            return Err(Error::FetchTooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        tracing::debug!(
            "fetched {} -> {} [{}] in {}ms ({} bytes)",
            request.url,
            final_url,
            status,
            start.elapsed().as_millis(),
            bytes.len()
        );

        Ok(self.build_response(status, final_url, &headers, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "swcache/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig { user_agent: "heritage/2".into(), max_bytes: 1024, timeout_ms: 5000, ..Default::default() };
        let config = FetchConfig::from_app(&app);
        assert_eq!(config.user_agent, "heritage/2");
        assert_eq!(config.max_bytes, 1024);
        assert_eq!(config.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn test_exceeds_limit() {
        assert!(!exceeds_limit(1024, 1024));
        assert!(exceeds_limit(1025, 1024));
        assert!(exceeds_limit((1u64 << 32) + 1, 5 * 1024 * 1024));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_response_copies_headers() {
        let client = FetchClient::new(FetchConfig::default()).unwrap();
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/html"));
        headers.insert(header::DATE, header::HeaderValue::from_static("Sat, 09 Mar 2024 14:05:07 GMT"));

        let response =
            client.build_response(404, "https://example.com/x".into(), &headers, Bytes::from_static(b"missing"));
        assert_eq!(response.status, 404);
        assert!(!response.ok());
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert!(response.captured_at().is_some());
        assert_eq!(response.body, b"missing");
    }
}
