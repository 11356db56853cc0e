/// Checks if a host matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.org" matches only "example.org"
/// 2. Wildcard match: "*.example.org" matches:
///    - "example.org" (the apex)
///    - "www.example.org" (single subdomain)
///    - "docs.v2.example.org" (nested subdomains)
///
/// Hosts are expected to be lowercase already.
///
/// # Examples
///
/// ```
/// use site_harvest::url::matches_wildcard;
///
/// assert!(matches_wildcard("example.org", "example.org"));
/// assert!(!matches_wildcard("example.org", "www.example.org"));
///
/// assert!(matches_wildcard("*.example.org", "example.org"));
/// assert!(matches_wildcard("*.example.org", "www.example.org"));
/// assert!(!matches_wildcard("*.example.org", "example.com"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base
            || candidate
                .strip_suffix(base)
                .map_or(false, |rest| rest.ends_with('.'))
    } else {
        candidate == pattern
    }
}
