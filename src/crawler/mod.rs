//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with content-type gating
//! - The frontier queue and its deduplication sets
//! - Content-region extraction and link harvesting
//! - Image mirroring with single-flight downloads
//! - Overall crawl coordination

mod assets;
mod coordinator;
mod extractor;
mod fetcher;
mod frontier;
mod render;

pub use assets::{is_image_content_type, AssetRecord, AssetStats, AssetStore, LocalPath, IMAGES_DIR};
pub use coordinator::{run_crawl, Coordinator};
pub use extractor::{ExtractedDocument, Extraction, Extractor, RegionStrategy, Survey};
pub use fetcher::{
    build_http_client, fetch_page, is_html_content_type, FetchError, FetchErrorKind, FetchedPage,
};
pub use frontier::{Dequeue, Frontier};
pub use render::{ImageRewrite, Rewrites, ORIGINAL_SRC_ATTR};
