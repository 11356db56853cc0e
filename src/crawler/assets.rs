//! Asset store: image downloads with run-wide deduplication
//!
//! Every unique absolute image URL is downloaded at most once per run. The index
//! maps each URL to a single-flight cell, so concurrent requests for the same
//! unseen URL wait on one download and all observe the same local path. Failures
//! are cached in the same cell, so a broken image is not retried within a run.
//!
//! Files land under `<root>/images/<route>/<file>`, keyed by the first route that
//! referenced the asset.

use crate::crawler::fetcher::{describe_request_error, media_type};
use crate::url::{Route, INDEX_ROUTE};
use regex::Regex;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

/// Directory under the output root holding mirrored images
pub const IMAGES_DIR: &str = "images";

/// Image media types accepted for download
const IMAGE_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/pjpeg",
    "image/gif",
    "image/webp",
    "image/svg+xml",
    "image/bmp",
    "image/x-icon",
    "image/vnd.microsoft.icon",
    "image/avif",
    "image/tiff",
];

/// Generic binary type, accepted only when the URL path looks like an image
const OCTET_STREAM: &str = "application/octet-stream";

/// Path extensions that qualify an octet-stream response as an image
const IMAGE_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".webp", ".svg", ".bmp", ".ico", ".avif", ".tif", ".tiff",
];

/// Where a mirrored asset lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalPath {
    /// Path relative to the output root, always `/`-separated
    /// (e.g. `images/docs/intro/pic.png`); this is what rewritten markup references
    pub relative: String,
    /// Absolute location on disk
    pub absolute: PathBuf,
}

/// Index entry for one downloaded asset
#[derive(Debug, Clone)]
pub struct AssetRecord {
    pub url: String,
    pub path: LocalPath,
    /// Hex SHA-256 of the downloaded bytes
    pub sha256: String,
    pub bytes: usize,
    /// Route that first referenced the asset
    pub first_route: String,
}

/// Counters for a run's asset activity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub downloaded: u64,
    pub reused: u64,
    pub failed: u64,
}

#[derive(Debug, Error)]
enum AssetError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("unsupported content type '{0}'")]
    UnsupportedContentType(String),

    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },
}

type AssetCell = Arc<OnceCell<Option<AssetRecord>>>;

/// Downloads and deduplicates images for one crawl run
pub struct AssetStore {
    client: Client,
    root: PathBuf,
    unsafe_chars: Regex,
    index: Mutex<HashMap<String, AssetCell>>,
    claimed: Mutex<HashMap<PathBuf, String>>,
    downloaded: AtomicU64,
    reused: AtomicU64,
    failed: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl AssetStore {
    /// Creates an empty store writing under `root`
    pub fn new(client: Client, root: impl Into<PathBuf>) -> crate::Result<Self> {
        Ok(Self {
            client,
            root: root.into(),
            unsafe_chars: Regex::new(r"[^A-Za-z0-9_.\-]")?,
            index: Mutex::new(HashMap::new()),
            claimed: Mutex::new(HashMap::new()),
            downloaded: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        })
    }

    /// Resolves an image reference to its local copy
    ///
    /// `raw` should already be absolute; protocol-relative references (`//host/x.png`)
    /// are upgraded to https. Returns `None` for `data:` URLs, non-HTTP schemes,
    /// non-image responses and failed downloads, in which case the caller leaves
    /// the reference untouched.
    pub async fn resolve(&self, raw: &str, route: &Route) -> Option<LocalPath> {
        let url = absolutize(raw)?;
        let key = url.to_string();

        let cell = {
            let mut index = lock(&self.index);
            Arc::clone(index.entry(key).or_default())
        };

        let mut initialized_here = false;
        let record = cell
            .get_or_init(|| {
                initialized_here = true;
                self.fetch_and_store(url, route)
            })
            .await;

        let record = record.as_ref()?;
        if !initialized_here {
            self.reused.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Reusing image {} -> {}", record.url, record.path.relative);
        }
        Some(record.path.clone())
    }

    /// Returns the record for an already-resolved URL, if it downloaded successfully
    pub fn lookup(&self, raw: &str) -> Option<AssetRecord> {
        let key = absolutize(raw)?.to_string();
        let cell = lock(&self.index).get(&key).cloned()?;
        cell.get().cloned().flatten()
    }

    /// Snapshot of the run's counters
    pub fn stats(&self) -> AssetStats {
        AssetStats {
            downloaded: self.downloaded.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    async fn fetch_and_store(&self, url: Url, route: &Route) -> Option<AssetRecord> {
        match self.download(&url, route).await {
            Ok(record) => {
                self.downloaded.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    "Downloaded image: {} -> {} ({} bytes)",
                    record.url,
                    record.path.relative,
                    record.bytes
                );
                Some(record)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                let err = crate::HarvestError::AssetDownload {
                    url: url.to_string(),
                    message: e.to_string(),
                };
                match e {
                    AssetError::UnsupportedContentType(_) => tracing::debug!("Skipping {}", err),
                    _ => tracing::warn!("{}", err),
                }
                None
            }
        }
    }

    async fn download(&self, url: &Url, route: &Route) -> Result<AssetRecord, AssetError> {
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| AssetError::Network(describe_request_error(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .unwrap_or_default();

        if !is_image_content_type(&content_type, url.path()) {
            return Err(AssetError::UnsupportedContentType(content_type));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AssetError::Network(describe_request_error(&e)))?;

        let sha256 = hex::encode(Sha256::digest(&bytes));
        let file_name = self.file_name_for(url, &content_type, &sha256);
        let relative = self.claim(route, &file_name, url.as_str());
        let absolute = self.root.join(&relative);

        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| AssetError::Filesystem {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        tokio::fs::write(&absolute, &bytes)
            .await
            .map_err(|source| AssetError::Filesystem {
                path: absolute.clone(),
                source,
            })?;

        Ok(AssetRecord {
            url: url.to_string(),
            path: LocalPath {
                relative: to_slash_string(&relative),
                absolute,
            },
            sha256,
            bytes: bytes.len(),
            first_route: route.as_str().to_string(),
        })
    }

    /// Derives the file name from the URL basename, or a hash-based name when the
    /// path has none
    fn file_name_for(&self, url: &Url, content_type: &str, sha256: &str) -> String {
        let basename = url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default();

        let cleaned = self.unsafe_chars.replace_all(basename, "_");
        if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
            format!("image_{}.{}", &sha256[..10], extension_for(content_type))
        } else {
            cleaned.into_owned()
        }
    }

    /// Reserves `images/<route>/<file>` for `url`
    ///
    /// Two different URLs that share a basename under the same route would
    /// overwrite each other, so the later one gets a URL-hash suffix.
    fn claim(&self, route: &Route, file_name: &str, url: &str) -> PathBuf {
        let dir = images_dir_for(route);
        let mut claimed = lock(&self.claimed);

        let candidate = dir.join(file_name);
        let path = match claimed.get(&candidate) {
            Some(owner) if owner != url => {
                let suffix = &hex::encode(Sha256::digest(url.as_bytes()))[..8];
                dir.join(with_suffix(file_name, suffix))
            }
            _ => candidate,
        };

        claimed.insert(path.clone(), url.to_string());
        path
    }
}

/// Turns an image reference into an absolute http(s) URL
fn absolutize(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }

    let owned;
    let raw = if raw.starts_with("//") {
        owned = format!("https:{}", raw);
        owned.as_str()
    } else {
        raw
    };

    let mut url = Url::parse(raw).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Returns true if the media type is an accepted image family
pub fn is_image_content_type(content_type: &str, path: &str) -> bool {
    if IMAGE_CONTENT_TYPES.contains(&content_type) {
        return true;
    }
    if content_type == OCTET_STREAM {
        let path = path.to_ascii_lowercase();
        return IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext));
    }
    false
}

fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/pjpeg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        "image/bmp" => "bmp",
        "image/x-icon" | "image/vnd.microsoft.icon" => "ico",
        "image/avif" => "avif",
        "image/tiff" => "tiff",
        _ => "png",
    }
}

fn images_dir_for(route: &Route) -> PathBuf {
    let route_path = route.to_relative_path();
    let route_path = if route_path.as_os_str().is_empty() {
        PathBuf::from(INDEX_ROUTE)
    } else {
        route_path
    };
    Path::new(IMAGES_DIR).join(route_path)
}

fn with_suffix(file_name: &str, suffix: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, suffix, ext),
        _ => format!("{}-{}", file_name, suffix),
    }
}

fn to_slash_string(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
