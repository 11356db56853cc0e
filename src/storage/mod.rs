//! Storage module for persisting extracted pages
//!
//! This module handles writing extracted content to disk:
//! - Route-derived output paths (leaf file vs. collection directory)
//! - Provenance headers on every written file
//! - Collision detection between files and directories

mod filesystem;
mod traits;

pub use filesystem::{provenance_header, FsPageWriter, ITEM_PAGE_FILE};
pub use traits::{PageWriter, StorageError, StorageResult};
