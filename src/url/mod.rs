//! URL handling module for Site-Harvest
//!
//! This module provides URL canonicalization, site scoping (host patterns plus
//! extension and prefix exclusions), and route derivation.

mod matcher;
mod normalize;
mod route;

use crate::config::SiteConfig;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

// Re-export main functions
pub use matcher::matches_wildcard;
pub use normalize::{normalize_url, resolve_and_normalize};
pub use route::{route_of, Route, RouteKind, INDEX_ROUTE};

/// A canonicalized page URL: scheme, host (with port) and path only
///
/// Produced exclusively by [`normalize_url`] / [`resolve_and_normalize`]; never
/// mutated afterwards. Equality and hashing use the canonical string, so it can
/// serve directly as a set key.
#[derive(Debug, Clone)]
pub struct CanonicalUrl {
    canonical: String,
    url: Url,
}

impl CanonicalUrl {
    pub(crate) fn from_parts(canonical: String, url: Url) -> Self {
        Self { canonical, url }
    }

    /// The canonical string form (no fragment, no query, no trailing slash)
    pub fn as_str(&self) -> &str {
        &self.canonical
    }

    /// The parsed URL, for joining relative references and issuing requests
    pub fn as_url(&self) -> &Url {
        &self.url
    }

    /// The lowercase host
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

impl PartialEq for CanonicalUrl {
    fn eq(&self, other: &Self) -> bool {
        self.canonical == other.canonical
    }
}

impl Eq for CanonicalUrl {}

impl Hash for CanonicalUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical.hash(state);
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical)
    }
}

/// Decides which canonical URLs belong to the crawl
///
/// A URL is in scope only if:
/// 1. Its host matches one of the configured host patterns
/// 2. Its lowercased path does not end with an excluded extension
/// 3. Its path does not begin with an excluded prefix
///
/// Out-of-scope URLs are filtered silently; they are never an error.
#[derive(Debug, Clone)]
pub struct Scope {
    hosts: Vec<String>,
    excluded_extensions: Vec<String>,
    excluded_prefixes: Vec<String>,
}

impl Scope {
    pub fn new(hosts: Vec<String>, excluded_extensions: Vec<String>, excluded_prefixes: Vec<String>) -> Self {
        Self {
            hosts: hosts.into_iter().map(|h| h.to_lowercase()).collect(),
            excluded_extensions: excluded_extensions
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect(),
            excluded_prefixes,
        }
    }

    /// Builds the scope of the configured site
    pub fn from_site(site: &SiteConfig) -> Self {
        Self::new(
            site.hosts.clone(),
            site.excluded_extensions.clone(),
            site.excluded_prefixes.clone(),
        )
    }

    /// Returns true if the host matches any configured pattern
    pub fn matches_host(&self, host: &str) -> bool {
        self.hosts.iter().any(|p| matches_wildcard(p, host))
    }

    /// Returns true if the URL should be crawled
    pub fn is_in_scope(&self, url: &CanonicalUrl) -> bool {
        if !self.matches_host(url.host()) {
            return false;
        }

        let path = url.as_url().path();
        let path_lower = path.to_lowercase();
        if self
            .excluded_extensions
            .iter()
            .any(|ext| path_lower.ends_with(ext.as_str()))
        {
            return false;
        }

        !self
            .excluded_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}
