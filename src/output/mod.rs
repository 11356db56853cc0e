//! Output module for crawl statistics and reports
//!
//! This module handles:
//! - Recording per-page outcomes during a run
//! - Printing the end-of-run statistics block
//! - Writing an optional markdown report

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_summary, CrawlStats, CrawlSummary, RunInfo};

use thiserror::Error;

/// Errors that can occur while writing reports
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
