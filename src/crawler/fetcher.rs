//! Page fetching
//!
//! The orchestrator only needs "give me the title, text and links of this
//! URL, or an error". This module defines that capability as the `Fetcher`
//! trait and provides the reqwest + scraper implementation used in
//! production.

use crate::config::UserAgentConfig;
use crate::crawler::parser::parse_html;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// A fetched and parsed page
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPage {
    /// The page title, if the document has one
    pub title: Option<String>,

    /// Visible body text
    pub content: String,

    /// Outbound links in document order (absolute, fragments removed)
    pub links: Vec<String>,
}

/// Failure to fetch one URL
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Expected HTML from {url}, got {content_type}")]
    ContentMismatch { url: String, content_type: String },
}

impl FetchError {
    /// The URL whose fetch failed
    pub fn url(&self) -> &str {
        match self {
            Self::Http { url, .. }
            | Self::Status { url, .. }
            | Self::Timeout { url }
            | Self::ContentMismatch { url, .. } => url,
        }
    }
}

/// Retrieves a single page
pub trait Fetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use spider_index::config::UserAgentConfig;
/// use spider_index::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "SpiderIndex".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Fetcher` backed by reqwest, parsing responses with scraper
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    /// Fetches a URL and parses it
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx with HTML (or no Content-Type) | `Ok(FetchedPage)` |
    /// | any other status | `FetchError::Status` |
    /// | non-HTML Content-Type | `FetchError::ContentMismatch` |
    /// | client timeout | `FetchError::Timeout` |
    /// | connection / TLS / body errors | `FetchError::Http` |
    ///
    /// Redirects are followed; relative links resolve against the final URL.
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if let Some(content_type) = content_type {
            if !is_html(&content_type) {
                return Err(FetchError::ContentMismatch {
                    url: url.to_string(),
                    content_type,
                });
            }
        }

        let final_url = response.url().clone();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(url, e))?;

        let parsed = parse_html(&body, &final_url);
        tracing::debug!(
            "Fetched {} ({} bytes, {} links)",
            final_url,
            body.len(),
            parsed.links.len()
        );

        Ok(FetchedPage {
            title: parsed.title,
            content: parsed.text,
            links: parsed.links,
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type.to_ascii_lowercase();
    mime.contains("text/html") || mime.contains("application/xhtml+xml")
}

fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}
