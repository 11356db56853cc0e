use crate::url::CanonicalUrl;
use std::fmt;
use std::path::PathBuf;

/// Route used for an empty URL path
pub const INDEX_ROUTE: &str = "index";

/// Final-segment extensions that mark a route as a leaf document
const PAGE_FILE_EXTENSIONS: &[&str] = &[".html", ".htm"];

/// Whether a route names a single document or a collection
///
/// URL paths do not distinguish "this is a document" from "this is a folder of
/// documents", so the decision is made once when the route is built and every
/// writer consults it instead of re-inspecting the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteKind {
    /// The final segment carries a page-file extension; content is written to the
    /// route itself
    Leaf,
    /// Anything else; content is written inside a directory named after the route
    Collection,
}

/// A slash-separated, filesystem-oriented path derived from a [`CanonicalUrl`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    path: String,
    kind: RouteKind,
}

/// Derives the route of a canonical URL
///
/// Strips scheme and host, then leading and trailing slashes. An empty path maps
/// to [`INDEX_ROUTE`]. Pure and total: the same URL always yields the same route.
///
/// # Examples
///
/// ```
/// use site_harvest::url::{normalize_url, route_of, RouteKind};
///
/// let url = normalize_url("https://example.org/docs/intro").unwrap();
/// let route = route_of(&url);
/// assert_eq!(route.as_str(), "docs/intro");
/// assert_eq!(route.kind(), RouteKind::Collection);
///
/// let root = normalize_url("https://example.org/").unwrap();
/// assert_eq!(route_of(&root).as_str(), "index");
/// ```
pub fn route_of(url: &CanonicalUrl) -> Route {
    Route::from_path(url.as_url().path())
}

impl Route {
    /// Builds a route from a raw URL path
    pub fn from_path(path: &str) -> Self {
        let trimmed = path.trim_matches('/');
        let path = if trimmed.is_empty() {
            INDEX_ROUTE.to_string()
        } else {
            trimmed.to_string()
        };
        let kind = classify(&path);
        Self { path, kind }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn kind(&self) -> RouteKind {
        self.kind
    }

    pub fn is_leaf(&self) -> bool {
        self.kind == RouteKind::Leaf
    }

    /// Non-empty path segments, skipping anything that could escape the output root
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty() && *s != "." && *s != "..")
    }

    /// The route as a relative filesystem path
    pub fn to_relative_path(&self) -> PathBuf {
        self.segments().collect()
    }

    /// Directory that holds the route's secondary documents
    ///
    /// For collections this is the route itself. For leaves the page-file extension
    /// is dropped, so `about/team.html` keeps its blog posts in `about/team/`.
    pub fn collection_dir(&self) -> PathBuf {
        let mut dir = self.to_relative_path();
        if self.kind == RouteKind::Leaf {
            if let Some(stem) = dir.file_stem().map(|s| s.to_os_string()) {
                dir.set_file_name(stem);
            }
        }
        dir
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

fn classify(path: &str) -> RouteKind {
    let last = path.rsplit('/').next().unwrap_or(path).to_ascii_lowercase();
    let is_page_file = PAGE_FILE_EXTENSIONS
        .iter()
        .any(|ext| last.len() > ext.len() && last.ends_with(ext));

    if is_page_file {
        RouteKind::Leaf
    } else {
        RouteKind::Collection
    }
}
