//! State module for tracking crawl progress
//!
//! `PageOutcome` records how each dequeued page ended. Frontier membership
//! (visited / queued) lives with the frontier itself in `crawler::frontier`.

mod page_state;

// Re-export main types
pub use page_state::PageOutcome;
