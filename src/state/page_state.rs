/// Page outcome definitions for tracking crawl progress
///
/// Every URL dequeued from the frontier ends in exactly one of these outcomes.
use crate::crawler::FetchErrorKind;
use std::fmt;

/// How processing of one dequeued page ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    // ===== Success =====
    /// Content regions were found and written
    Saved {
        /// Number of files written for the page
        files: usize,
    },

    /// The page was fetched but held no target content region; its links were
    /// still followed
    NoContent,

    // ===== Failures =====
    /// The page could not be fetched; it contributed no content and no links
    FetchFailed(FetchErrorKind),

    /// Content was extracted but writing it failed; its links were still followed
    WriteFailed,
}

impl PageOutcome {
    /// Returns true if content was persisted for the page
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }

    /// Returns true if the page's links were harvested
    pub fn followed_links(&self) -> bool {
        !matches!(self, Self::FetchFailed(_))
    }

    /// Returns true if this represents a failure
    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed(_) | Self::WriteFailed)
    }

    /// Number of files written for the page
    pub fn files_written(&self) -> usize {
        match self {
            Self::Saved { files } => *files,
            _ => 0,
        }
    }

    /// Short label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::Saved { .. } => "saved",
            Self::NoContent => "no_content",
            Self::FetchFailed(kind) => kind.label(),
            Self::WriteFailed => "write_failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Saved { files } => write!(f, "saved ({} files)", files),
            other => f.write_str(other.label()),
        }
    }
}
