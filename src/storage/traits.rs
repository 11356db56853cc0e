//! Storage traits and error types
//!
//! This module defines the trait interface for page writers and the errors they
//! report.

use crate::crawler::ExtractedDocument;
use crate::url::{CanonicalUrl, Route};
use chrono::{DateTime, Local};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while persisting a page
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Filesystem error at {}: {source}", path.display())]
    Filesystem {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Two URLs map to one file, or a file sits where a directory is needed
    #[error("Path collision at {}", path.display())]
    PathCollision { path: PathBuf },
}

impl From<StorageError> for crate::HarvestError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Filesystem { path, source } => Self::Filesystem { path, source },
            StorageError::PathCollision { path } => Self::PathCollision { path },
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page persistence backends
///
/// Implementations must be shareable across crawl workers.
pub trait PageWriter: Send + Sync {
    /// Writes every fragment of an extracted document
    ///
    /// # Arguments
    ///
    /// * `url` - Source page, recorded in the provenance header
    /// * `route` - Route the output paths are derived from
    /// * `document` - Fragments to write; an empty document writes nothing
    /// * `scraped_at` - Timestamp recorded in the provenance header
    ///
    /// # Returns
    ///
    /// The paths written, primary first, then secondary fragments in order
    fn write(
        &self,
        url: &CanonicalUrl,
        route: &Route,
        document: &ExtractedDocument,
        scraped_at: DateTime<Local>,
    ) -> StorageResult<Vec<PathBuf>>;
}
