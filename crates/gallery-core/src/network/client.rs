//! HTTP page fetching.
//!
//! Provides a wrapper around reqwest with:
//! - The run's fixed header set (user agent, accept, cookie) on every request
//! - A per-request timeout
//! - The bounded retry loop from [`super::retry`]

use super::retry::{retry_async, RetryConfig};
use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;
use tracing::debug;

/// A successfully fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub body: String,
}

/// Source of HTML pages.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url`, retrying transient failures. Errors are final.
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

/// HTTP client bound to one crawl configuration.
pub struct HttpClient {
    client: Client,
    timeout: Duration,
    retry: RetryConfig,
}

impl HttpClient {
    /// Create a client carrying the headers, timeout and retry settings of `config`.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .default_headers(build_headers(config.headers())?)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| CrawlError::Network {
                message: format!("Failed to create HTTP client: {}", e),
                source: Some(e),
            })?;

        Ok(Self {
            client,
            timeout: config.request_timeout(),
            retry: RetryConfig::from_crawl_config(config),
        })
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// One GET without retries. Anything but 200 is an error.
    pub async fn get_once(&self, url: &str) -> Result<Response> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                CrawlError::Timeout(self.timeout)
            } else {
                CrawlError::Network {
                    message: format!("GET {} failed: {}", url, e),
                    source: Some(e),
                }
            }
        })?;

        check_status(url, response.status())?;
        Ok(response)
    }

    async fn fetch_once(&self, url: &str) -> Result<FetchedPage> {
        let response = self.get_once(url).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| CrawlError::Network {
            message: format!("Failed to read body of {}: {}", url, e),
            source: Some(e),
        })?;
        Ok(FetchedPage {
            url: url.to_string(),
            status,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let (result, stats) =
            retry_async(&self.retry, || self.fetch_once(url), CrawlError::is_retryable).await;

        if stats.attempts > 1 {
            debug!(
                "GET {} finished after {} attempts (total delay: {:?})",
                url, stats.attempts, stats.total_delay
            );
        }
        result
    }
}

/// Map a response status to the crawler's error taxonomy.
///
/// 404 is definitive; every other non-200 status is worth another attempt.
pub fn check_status(url: &str, status: StatusCode) -> Result<()> {
    match status {
        StatusCode::OK => Ok(()),
        StatusCode::NOT_FOUND => Err(CrawlError::NotFound {
            url: url.to_string(),
        }),
        other => Err(CrawlError::HttpStatus {
            url: url.to_string(),
            status: other.as_u16(),
        }),
    }
}

/// Convert configured header pairs into a reqwest header map.
pub fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| CrawlError::config(format!("invalid header name {:?}: {}", name, e)))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| CrawlError::config(format!("invalid value for header {}: {}", name, e)))?;
        map.insert(header_name, header_value);
    }
    Ok(map)
}
