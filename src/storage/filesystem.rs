//! Route-derived file tree writer
//!
//! Output layout under the root:
//!
//! | Route kind | Primary fragment | Secondary fragments |
//! |------------|------------------|---------------------|
//! | Collection (`docs/intro`) | `docs/intro/item-page.html` | `docs/intro/blogpost-N.html` |
//! | Leaf (`about/team.html`) | `about/team.html` | `about/team/blogpost-N.html` |
//!
//! Every file starts with two provenance comment lines. A path belongs to the
//! first URL that writes it during a run; any other URL mapping onto the same
//! file is rejected as a collision.

use crate::crawler::ExtractedDocument;
use crate::storage::traits::{PageWriter, StorageError, StorageResult};
use crate::url::{CanonicalUrl, Route, RouteKind};
use chrono::{DateTime, Local};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// File name of the primary fragment inside a collection directory
pub const ITEM_PAGE_FILE: &str = "item-page.html";

/// Timestamp format of the `Scraped:` header line
const SCRAPED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes extracted documents beneath an output root
#[derive(Debug)]
pub struct FsPageWriter {
    root: PathBuf,
    /// Output path -> canonical URL that owns it for this run
    claimed: Mutex<HashMap<PathBuf, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FsPageWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            claimed: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the primary fragment for a route
    pub fn primary_path(&self, route: &Route) -> PathBuf {
        let base = self.root.join(route.to_relative_path());
        match route.kind() {
            RouteKind::Leaf => base,
            RouteKind::Collection => base.join(ITEM_PAGE_FILE),
        }
    }

    /// Path of the `index`-th secondary fragment (numbered from 1)
    pub fn secondary_path(&self, route: &Route, index: usize) -> PathBuf {
        self.root
            .join(route.collection_dir())
            .join(format!("blogpost-{}.html", index))
    }

    /// Reserves every path for `url`, or none of them
    ///
    /// Fails with `PathCollision` if another URL already owns one of the paths.
    fn claim(&self, url: &CanonicalUrl, paths: &[PathBuf]) -> StorageResult<()> {
        let mut claimed = lock(&self.claimed);

        if let Some((path, owner)) = paths.iter().find_map(|path| {
            claimed
                .get(path)
                .filter(|owner| owner.as_str() != url.as_str())
                .map(|owner| (path, owner))
        }) {
            tracing::warn!(
                "{} maps to {}, already written for {}",
                url,
                path.display(),
                owner
            );
            return Err(StorageError::PathCollision { path: path.clone() });
        }

        for path in paths {
            claimed.insert(path.clone(), url.as_str().to_string());
        }
        Ok(())
    }
}

/// Builds the two-line provenance header
pub fn provenance_header(url: &CanonicalUrl, scraped_at: DateTime<Local>) -> String {
    format!(
        "<!-- Source: {} -->\n<!-- Scraped: {} -->\n",
        url,
        scraped_at.format(SCRAPED_AT_FORMAT)
    )
}

impl PageWriter for FsPageWriter {
    fn write(
        &self,
        url: &CanonicalUrl,
        route: &Route,
        document: &ExtractedDocument,
        scraped_at: DateTime<Local>,
    ) -> StorageResult<Vec<PathBuf>> {
        let header = provenance_header(url, scraped_at);

        let mut fragments = Vec::with_capacity(document.fragment_count());
        if let Some(primary) = &document.primary {
            fragments.push((self.primary_path(route), primary.as_str()));
        }
        for (i, post) in document.secondary.iter().enumerate() {
            fragments.push((self.secondary_path(route, i + 1), post.as_str()));
        }

        let paths: Vec<PathBuf> = fragments.iter().map(|(path, _)| path.clone()).collect();
        self.claim(url, &paths)?;

        for (path, content) in &fragments {
            write_fragment(path, &header, content)?;
            tracing::info!("Saved: {}", path.display());
        }

        Ok(paths)
    }
}

fn write_fragment(path: &Path, header: &str, content: &str) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    if path.is_dir() {
        return Err(StorageError::PathCollision {
            path: path.to_path_buf(),
        });
    }

    let mut out = String::with_capacity(header.len() + content.len());
    out.push_str(header);
    out.push_str(content);

    fs::write(path, out).map_err(|source| StorageError::Filesystem {
        path: path.to_path_buf(),
        source,
    })
}

/// Creates a directory, reporting a collision if a file is in the way
fn ensure_dir(dir: &Path) -> StorageResult<()> {
    for ancestor in dir.ancestors() {
        if ancestor.is_file() {
            return Err(StorageError::PathCollision {
                path: ancestor.to_path_buf(),
            });
        }
    }

    fs::create_dir_all(dir).map_err(|source| StorageError::Filesystem {
        path: dir.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::{normalize_url, route_of};
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn scraped_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 9).unwrap()
    }

    fn write_page(
        writer: &FsPageWriter,
        url: &str,
        document: &ExtractedDocument,
    ) -> StorageResult<Vec<PathBuf>> {
        let url = normalize_url(url).unwrap();
        writer.write(&url, &route_of(&url), document, scraped_at())
    }

    fn document(primary: Option<&str>, secondary: &[&str]) -> ExtractedDocument {
        ExtractedDocument {
            primary: primary.map(str::to_string),
            secondary: secondary.iter().map(|s| s.to_string()).collect(),
            primary_strategy: primary.map(|_| "item-page"),
        }
    }

    #[test]
    fn test_collection_route_writes_item_page() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());

        let paths = write_page(
            &writer,
            "https://example.org/docs/intro",
            &document(Some("<div>intro</div>"), &[]),
        )
        .unwrap();

        assert_eq!(paths, vec![dir.path().join("docs/intro/item-page.html")]);
        let content = fs::read_to_string(&paths[0]).unwrap();
        assert_eq!(
            content,
            "<!-- Source: https://example.org/docs/intro -->\n\
             <!-- Scraped: 2024-03-05 14:07:09 -->\n\
             <div>intro</div>"
        );
    }

    #[test]
    fn test_root_url_uses_index_route() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());
        write_page(&writer, "https://example.org/", &document(Some("<p>home</p>"), &[])).unwrap();
        assert!(dir.path().join("index/item-page.html").is_file());
    }

    #[test]
    fn test_leaf_route_writes_file_directly() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());

        let paths = write_page(
            &writer,
            "https://example.org/about/team.html",
            &document(Some("<p>team</p>"), &["<p>post</p>"]),
        )
        .unwrap();

        assert_eq!(
            paths,
            vec![
                dir.path().join("about/team.html"),
                dir.path().join("about/team/blogpost-1.html"),
            ]
        );
        assert!(paths.iter().all(|p| p.is_file()));
    }

    #[test]
    fn test_blog_posts_numbered_from_one() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());

        let paths = write_page(
            &writer,
            "https://example.org/news",
            &document(None, &["<p>a</p>", "<p>b</p>", "<p>c</p>"]),
        )
        .unwrap();

        assert_eq!(paths.len(), 3);
        assert!(!dir.path().join("news/item-page.html").exists());
        for (i, path) in paths.iter().enumerate() {
            assert_eq!(path, &dir.path().join(format!("news/blogpost-{}.html", i + 1)));
            let content = fs::read_to_string(path).unwrap();
            assert!(content.starts_with("<!-- Source: https://example.org/news -->\n"));
        }
        assert!(fs::read_to_string(&paths[1]).unwrap().ends_with("<p>b</p>"));
    }

    #[test]
    fn test_empty_document_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());
        let paths = write_page(&writer, "https://example.org/empty", &ExtractedDocument::default())
            .unwrap();
        assert!(paths.is_empty());
        assert!(!dir.path().join("empty").exists());
    }

    #[test]
    fn test_file_in_the_way_is_collision() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());

        write_page(
            &writer,
            "https://example.org/guide.html",
            &document(Some("<p>leaf</p>"), &[]),
        )
        .unwrap();

        let err = write_page(
            &writer,
            "https://example.org/guide.html/part",
            &document(Some("<p>nested</p>"), &[]),
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::PathCollision { .. }));

        let harvest: crate::HarvestError = err.into();
        assert!(matches!(harvest, crate::HarvestError::PathCollision { .. }));
    }

    #[test]
    fn test_collection_and_item_page_leaf_collide() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());

        write_page(&writer, "https://example.org/docs", &document(Some("FIRST"), &[])).unwrap();
        let err = write_page(
            &writer,
            "https://example.org/docs/item-page.html",
            &document(Some("SECOND"), &[]),
        )
        .unwrap_err();

        match err {
            StorageError::PathCollision { path } => {
                assert_eq!(path, dir.path().join("docs/item-page.html"));
            }
            other => panic!("expected collision, got {:?}", other),
        }
        let content = fs::read_to_string(dir.path().join("docs/item-page.html")).unwrap();
        assert!(content.starts_with("<!-- Source: https://example.org/docs -->\n"));
        assert!(content.ends_with("FIRST"));
    }

    #[test]
    fn test_leaf_and_collection_blog_posts_collide() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());

        write_page(&writer, "https://example.org/about/team", &document(None, &["POST-A"]))
            .unwrap();
        let err = write_page(
            &writer,
            "https://example.org/about/team.html",
            &document(Some("leaf"), &["POST-B"]),
        )
        .unwrap_err();

        assert!(matches!(err, StorageError::PathCollision { .. }));
        let post = fs::read_to_string(dir.path().join("about/team/blogpost-1.html")).unwrap();
        assert!(post.ends_with("POST-A"));
        // Rejected pages write none of their fragments
        assert!(!dir.path().join("about/team.html").exists());
    }

    #[test]
    fn test_rewrite_overwrites_previous_run() {
        let dir = TempDir::new().unwrap();
        let writer = FsPageWriter::new(dir.path());
        write_page(&writer, "https://example.org/docs", &document(Some("old"), &[])).unwrap();
        let paths = write_page(&writer, "https://example.org/docs", &document(Some("new"), &[]))
            .unwrap();
        assert!(fs::read_to_string(&paths[0]).unwrap().ends_with("new"));
    }
}
