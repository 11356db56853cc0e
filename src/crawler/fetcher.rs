//! HTTP fetcher implementation
//!
//! This module handles all page requests for the crawler, including:
//! - Building the HTTP client with user agent, timeouts and default headers
//! - GET requests to fetch page content
//! - Content-Type gating (only HTML is processed)
//! - Error classification
//!
//! There are no retries: a failed page is abandoned for the rest of the run.

use crate::config::Config;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Content types accepted as crawlable pages
const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value
    pub content_type: String,
    /// Page body
    pub body: String,
}

/// Why a page fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or body read failure
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// Non-2xx response
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Response is not an HTML document
    #[error("Unexpected content type '{content_type}' for {url}")]
    UnexpectedContentType { url: String, content_type: String },
}

/// Fetch failure classification, used for statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FetchErrorKind {
    Network,
    HttpStatus,
    UnexpectedContentType,
}

impl FetchErrorKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::HttpStatus => "http_status",
            Self::UnexpectedContentType => "unexpected_content_type",
        }
    }
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            Self::Network { .. } => FetchErrorKind::Network,
            Self::HttpStatus { .. } => FetchErrorKind::HttpStatus,
            Self::UnexpectedContentType { .. } => FetchErrorKind::UnexpectedContentType,
        }
    }
}

impl From<FetchError> for crate::HarvestError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Network { url, message } => Self::Network { url, message },
            FetchError::HttpStatus { url, status } => Self::HttpStatus { url, status },
            FetchError::UnexpectedContentType { url, content_type } => {
                Self::UnsupportedContentType { url, content_type }
            }
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client carries:
/// - User agent `Name/Version (+ContactURL; ContactEmail)`
/// - `Accept` / `Accept-Language` headers preferring HTML
/// - The configured request timeout (connect timeout capped at 10s)
/// - A redirect limit of 10 hops
///
/// # Example
///
/// ```no_run
/// use site_harvest::config::load_config;
/// use site_harvest::crawler::build_http_client;
/// use std::path::Path;
///
/// let config = load_config(Path::new("harvest.toml")).unwrap();
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

    let timeout = Duration::from_secs(config.crawler.request_timeout_secs);

    Client::builder()
        .user_agent(config.user_agent.header_value())
        .default_headers(headers)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page with a single GET
///
/// # Request Flow
///
/// | Condition | Result |
/// |-----------|--------|
/// | Connection failure / timeout | `FetchError::Network` |
/// | Non-2xx status | `FetchError::HttpStatus` |
/// | Content-Type not HTML | `FetchError::UnexpectedContentType` |
/// | Body read failure | `FetchError::Network` |
pub async fn fetch_page(client: &Client, url: &str) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FetchError::Network {
            url: url.to_string(),
            message: describe_request_error(&e),
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if !is_html_content_type(&content_type) {
        return Err(FetchError::UnexpectedContentType {
            url: url.to_string(),
            content_type,
        });
    }

    let body = response.text().await.map_err(|e| FetchError::Network {
        url: url.to_string(),
        message: describe_request_error(&e),
    })?;

    Ok(FetchedPage {
        status_code: status.as_u16(),
        content_type,
        body,
    })
}

/// Returns true if the Content-Type header denotes an HTML document
pub fn is_html_content_type(content_type: &str) -> bool {
    let essence = media_type(content_type);
    HTML_CONTENT_TYPES.contains(&essence.as_str())
}

/// Lowercased media type without parameters (`"Text/HTML; charset=utf-8"` → `"text/html"`)
pub(crate) fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Classifies a reqwest failure into a short message
pub(crate) fn describe_request_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        format!("Connection failed: {}", e)
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    }
}
