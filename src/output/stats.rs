//! Run statistics
//!
//! `CrawlStats` is shared by all workers and records the outcome of every dequeued
//! page. At the end of the run it is frozen into a `CrawlSummary`.

use crate::crawler::{AssetStats, FetchErrorKind};
use crate::state::PageOutcome;
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Counters {
    pages_visited: u64,
    pages_saved: u64,
    pages_no_content: u64,
    files_written: u64,
    fetch_failures: BTreeMap<FetchErrorKind, u64>,
    write_failures: u64,
    links_enqueued: u64,
    images_rewritten: u64,
}

/// Live counters for one crawl run
#[derive(Debug, Default)]
pub struct CrawlStats {
    counters: Mutex<Counters>,
}

impl CrawlStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Counters> {
        self.counters.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Records how a page ended; returns the page's 1-based visit number
    pub fn record(&self, outcome: PageOutcome) -> u64 {
        let mut c = self.lock();
        c.pages_visited += 1;
        match outcome {
            PageOutcome::Saved { files } => {
                c.pages_saved += 1;
                c.files_written += files as u64;
            }
            PageOutcome::NoContent => c.pages_no_content += 1,
            PageOutcome::FetchFailed(kind) => *c.fetch_failures.entry(kind).or_insert(0) += 1,
            PageOutcome::WriteFailed => c.write_failures += 1,
        }
        c.pages_visited
    }

    /// Adds newly enqueued links discovered on a page
    pub fn record_links(&self, enqueued: usize) {
        self.lock().links_enqueued += enqueued as u64;
    }

    pub fn record_images(&self, rewritten: usize) {
        self.lock().images_rewritten += rewritten as u64;
    }

    pub fn pages_visited(&self) -> u64 {
        self.lock().pages_visited
    }

    /// Freezes the counters into a summary
    pub fn summarize(&self, run: RunInfo, assets: AssetStats) -> CrawlSummary {
        let c = self.lock();
        let duration_secs = (run.finished_at - run.started_at)
            .to_std()
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);

        CrawlSummary {
            started_at: run.started_at,
            finished_at: run.finished_at,
            duration_secs,
            config_hash: run.config_hash,
            output_root: run.output_root,
            cap_reached: run.cap_reached,
            pages_visited: c.pages_visited,
            pages_saved: c.pages_saved,
            pages_no_content: c.pages_no_content,
            files_written: c.files_written,
            fetch_failures: c.fetch_failures.clone(),
            write_failures: c.write_failures,
            links_enqueued: c.links_enqueued,
            images_rewritten: c.images_rewritten,
            assets,
        }
    }
}

/// Run metadata known only to the coordinator
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub config_hash: Option<String>,
    pub output_root: PathBuf,
    pub cap_reached: bool,
}

/// Summary statistics for a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlSummary {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub duration_secs: f64,
    pub config_hash: Option<String>,
    pub output_root: PathBuf,
    /// True if the run stopped at the page cap rather than an empty frontier
    pub cap_reached: bool,

    pub pages_visited: u64,
    pub pages_saved: u64,
    pub pages_no_content: u64,
    pub files_written: u64,
    pub fetch_failures: BTreeMap<FetchErrorKind, u64>,
    pub write_failures: u64,
    pub links_enqueued: u64,
    pub images_rewritten: u64,
    pub assets: AssetStats,
}

impl CrawlSummary {
    pub fn total_fetch_failures(&self) -> u64 {
        self.fetch_failures.values().sum()
    }

    pub fn total_errors(&self) -> u64 {
        self.total_fetch_failures() + self.write_failures
    }

    /// Percentage of visited pages that produced at least one file
    pub fn save_rate(&self) -> f64 {
        if self.pages_visited == 0 {
            0.0
        } else {
            (self.pages_saved as f64 / self.pages_visited as f64) * 100.0
        }
    }

    pub fn pages_per_second(&self) -> f64 {
        if self.duration_secs > 0.0 {
            self.pages_visited as f64 / self.duration_secs
        } else {
            0.0
        }
    }
}

/// Prints a summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  Pages visited: {}", summary.pages_visited);
    println!("  Pages saved: {}", summary.pages_saved);
    println!("  Pages without content: {}", summary.pages_no_content);
    println!("  Files written: {}", summary.files_written);
    println!("  Links enqueued: {}", summary.links_enqueued);
    println!(
        "  Duration: {:.1}s ({:.2} pages/sec)",
        summary.duration_secs,
        summary.pages_per_second()
    );
    if summary.cap_reached {
        println!("  Stopped at page cap");
    }
    println!();

    println!("Images:");
    println!("  Downloaded: {}", summary.assets.downloaded);
    println!("  Reused: {}", summary.assets.reused);
    println!("  Failed: {}", summary.assets.failed);
    println!("  References rewritten: {}", summary.images_rewritten);
    println!();

    if summary.total_errors() > 0 {
        println!("Error Summary:");
        for (kind, count) in &summary.fetch_failures {
            println!("  {}: {}", kind, count);
        }
        if summary.write_failures > 0 {
            println!("  write_failed: {}", summary.write_failures);
        }
        println!();
    }

    println!(
        "Save Rate: {:.1}% ({} / {} pages saved)",
        summary.save_rate(),
        summary.pages_saved,
        summary.pages_visited
    );
}
