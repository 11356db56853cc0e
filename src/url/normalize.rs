use crate::url::CanonicalUrl;
use crate::UrlError;
use url::Url;

/// Normalizes a URL according to Site-Harvest's canonicalization rules
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Accept only `http` and `https` URLs that carry a host
/// 3. Lowercase scheme and host (the path keeps its case)
/// 4. Drop credentials, query string and fragment
/// 5. Strip every trailing slash from the path
///
/// Two URLs differing only by fragment or trailing slash yield the same
/// [`CanonicalUrl`].
///
/// # Examples
///
/// ```
/// use site_harvest::url::normalize_url;
///
/// let url = normalize_url("HTTPS://Example.ORG/Docs/Intro/#section").unwrap();
/// assert_eq!(url.as_str(), "https://example.org/Docs/Intro");
/// ```
pub fn normalize_url(url_str: &str) -> Result<CanonicalUrl, UrlError> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;
    canonicalize(url)
}

/// Resolves `href` against `base` and normalizes the result
///
/// This is how every link and seed enters the crawl: relative references are
/// joined first, then canonicalized.
pub fn resolve_and_normalize(base: &Url, href: &str) -> Result<CanonicalUrl, UrlError> {
    let joined = base
        .join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;
    canonicalize(joined)
}

fn canonicalize(mut url: Url) -> Result<CanonicalUrl, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    // The url crate already lowercases scheme and host for special schemes
    let _ = url.set_username("");
    let _ = url.set_password(None);
    url.set_query(None);
    url.set_fragment(None);

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    let canonical = url.as_str().trim_end_matches('/').to_string();
    Ok(CanonicalUrl::from_parts(canonical, url))
}
