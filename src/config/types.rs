use serde::Deserialize;

/// File extensions that never denote a crawlable page
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".css", ".js", ".zip", ".tar", ".gz",
    ".xml", ".json",
];

/// Path prefixes of service, API, download and browser endpoints
pub const DEFAULT_EXCLUDED_PREFIXES: &[&str] = &[
    "/ContentService",
    "/AnalysisService",
    "/PathwayBrowser",
    "/download",
    "/icon-lib",
    "/gsa",
];

/// Main configuration structure for Site-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay each worker honors after every page fetch (milliseconds)
    #[serde(rename = "delay-ms", default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Timeout for a single page or image request (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum number of pages to dequeue; unlimited when absent
    #[serde(rename = "max-pages", default)]
    pub max_pages: Option<u32>,

    /// Visit the seeds only, never following discovered links
    #[serde(rename = "seeds-only", default)]
    pub seeds_only: bool,

    /// Number of workers pulling from the frontier
    #[serde(default = "default_workers")]
    pub workers: u32,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Root directory of the mirrored file tree
    #[serde(default = "default_output_root")]
    pub root: String,

    /// Path of the markdown run report; no report when absent
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<String>,
}

/// The site being mirrored
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Host patterns considered in scope (e.g., "example.org" or "*.example.org")
    pub hosts: Vec<String>,

    /// Seed URLs to start crawling from
    pub seeds: Vec<String>,

    /// Path endings that are never crawled
    #[serde(rename = "excluded-extensions", default = "default_excluded_extensions")]
    pub excluded_extensions: Vec<String>,

    /// Path prefixes that are never crawled
    #[serde(rename = "excluded-prefixes", default = "default_excluded_prefixes")]
    pub excluded_prefixes: Vec<String>,
}

/// Content-region extraction switches
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionConfig {
    /// Save the whole document body when no content region matches
    #[serde(rename = "fallback-to-document", default)]
    pub fallback_to_document: bool,
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_workers() -> u32 {
    1
}

fn default_output_root() -> String {
    "scraped_pages".to_string()
}

pub(crate) fn default_excluded_extensions() -> Vec<String> {
    DEFAULT_EXCLUDED_EXTENSIONS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

pub(crate) fn default_excluded_prefixes() -> Vec<String> {
    DEFAULT_EXCLUDED_PREFIXES
        .iter()
        .map(|s| s.to_string())
        .collect()
}
