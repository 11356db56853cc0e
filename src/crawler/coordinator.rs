//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the components together:
//! - Seeding the frontier
//! - Running a fixed pool of workers over the shared frontier
//! - Fetch, extract, enqueue, persist for each page
//! - Collecting run statistics
//!
//! Each worker sleeps for the configured delay after every page it processes, so
//! the politeness delay applies per worker.

use crate::config::Config;
use crate::crawler::assets::AssetStore;
use crate::crawler::extractor::Extractor;
use crate::crawler::fetcher::{build_http_client, fetch_page};
use crate::crawler::frontier::Frontier;
use crate::output::{CrawlStats, CrawlSummary, RunInfo};
use crate::state::PageOutcome;
use crate::storage::{FsPageWriter, PageWriter};
use crate::url::{normalize_url, route_of, CanonicalUrl, Scope};
use crate::HarvestError;
use chrono::Local;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Everything the workers share for one run
struct CrawlContext {
    client: Client,
    frontier: Frontier,
    assets: AssetStore,
    extractor: Extractor,
    writer: Arc<dyn PageWriter>,
    stats: CrawlStats,
    started: AtomicU64,
    delay: Duration,
    seeds_only: bool,
}

/// Marks a dequeued page as finished when dropped, so the frontier's in-flight
/// count stays correct even if processing unwinds
struct InFlight<'a>(&'a Frontier);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.complete();
    }
}

/// Main crawler coordinator structure
///
/// Owns all per-run state. Nothing survives the run except the files written.
pub struct Coordinator {
    context: CrawlContext,
    workers: u32,
    output_root: PathBuf,
    config_hash: Option<String>,
}

impl Coordinator {
    /// Creates a coordinator and seeds its frontier
    ///
    /// Seeds that fail to normalize or fall outside the site scope are logged and
    /// skipped.
    ///
    /// # Errors
    ///
    /// Fails only on setup problems: HTTP client construction or invalid built-in
    /// selectors and patterns.
    pub fn new(config: Config) -> crate::Result<Self> {
        let client = build_http_client(&config)?;
        let scope = Scope::from_site(&config.site);
        let output_root = PathBuf::from(&config.output.root);

        let extractor = Extractor::new(scope.clone(), config.extraction.fallback_to_document)?;
        let assets = AssetStore::new(client.clone(), output_root.clone())?;
        let frontier = Frontier::new(config.crawler.max_pages);

        let mut seeded = 0;
        for seed in &config.site.seeds {
            match normalize_url(seed) {
                Ok(url) if scope.is_in_scope(&url) => {
                    if frontier.enqueue(url) {
                        seeded += 1;
                    }
                }
                Ok(url) => tracing::warn!("Skipping out-of-scope seed {}", url),
                Err(e) => tracing::warn!("Skipping invalid seed {}: {}", seed, e),
            }
        }
        tracing::info!("Seeded frontier with {} URL(s)", seeded);

        Ok(Self {
            context: CrawlContext {
                client,
                frontier,
                assets,
                extractor,
                writer: Arc::new(FsPageWriter::new(output_root.clone())),
                stats: CrawlStats::new(),
                started: AtomicU64::new(0),
                delay: Duration::from_millis(config.crawler.delay_ms),
                seeds_only: config.crawler.seeds_only,
            },
            workers: config.crawler.workers.max(1),
            output_root,
            config_hash: None,
        })
    }

    /// Replaces the page writer
    pub fn with_writer(mut self, writer: Arc<dyn PageWriter>) -> Self {
        self.context.writer = writer;
        self
    }

    /// Records the configuration hash in the run summary
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Number of URLs waiting in the frontier
    pub fn frontier_size(&self) -> usize {
        self.context.frontier.queued_count()
    }

    /// Runs the crawl to completion
    ///
    /// The run ends when the frontier is exhausted or the page cap is reached.
    /// Page-level failures are logged and counted but never abort the run.
    pub async fn run(self) -> crate::Result<CrawlSummary> {
        let started_at = Local::now();
        tracing::info!(
            "Starting crawl with {} worker(s), {} URL(s) queued",
            self.workers,
            self.frontier_size()
        );

        let context = Arc::new(self.context);
        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            let context = Arc::clone(&context);
            workers.spawn(async move { context.worker_loop(id).await });
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Crawl worker failed: {}", e);
            }
        }

        let cap_reached = context.frontier.cap_reached();
        if cap_reached {
            tracing::info!("Reached maximum pages limit");
        }

        let summary = context.stats.summarize(
            RunInfo {
                started_at,
                finished_at: Local::now(),
                config_hash: self.config_hash,
                output_root: self.output_root,
                cap_reached,
            },
            context.assets.stats(),
        );

        tracing::info!(
            "Crawling complete. Total pages visited: {}",
            summary.pages_visited
        );
        Ok(summary)
    }
}

impl CrawlContext {
    async fn worker_loop(&self, id: u32) {
        while let Some(url) = self.frontier.next().await {
            let outcome = {
                let _in_flight = InFlight(&self.frontier);
                self.process_page(&url).await
            };

            let visited = self.stats.record(outcome);
            tracing::debug!("[worker {}] {} -> {} ({} visited)", id, url, outcome, visited);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
        }
        tracing::trace!("[worker {}] frontier drained", id);
    }

    /// Processes a single URL
    ///
    /// This method:
    /// 1. Fetches the page
    /// 2. Extracts regions, mirroring their images
    /// 3. Enqueues discovered links (unless seeds-only)
    /// 4. Persists the extracted regions
    async fn process_page(&self, url: &CanonicalUrl) -> PageOutcome {
        let n = self.started.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!("Scraping ({}): {}", n, url);

        let page = match fetch_page(&self.client, url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                let kind = e.kind();
                tracing::error!("Error fetching {}: {}", url, HarvestError::from(e));
                return PageOutcome::FetchFailed(kind);
            }
        };

        let route = route_of(url);
        let extraction = self
            .extractor
            .extract(&page.body, url, &route, &self.assets)
            .await;
        self.stats.record_images(extraction.images_rewritten);

        if !self.seeds_only {
            let mut links: Vec<_> = extraction.links.into_iter().collect();
            links.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            let enqueued = links
                .into_iter()
                .filter(|link| self.frontier.enqueue(link.clone()))
                .count();
            self.stats.record_links(enqueued);
        }

        if extraction.document.is_empty() {
            tracing::debug!(
                "{}",
                HarvestError::NoContentFound {
                    url: url.to_string()
                }
            );
            return PageOutcome::NoContent;
        }

        match self
            .writer
            .write(url, &route, &extraction.document, Local::now())
        {
            Ok(files) => PageOutcome::Saved { files: files.len() },
            Err(e) => {
                tracing::error!("Failed to save content for {}: {}", url, HarvestError::from(e));
                PageOutcome::WriteFailed
            }
        }
    }
}

/// Runs a complete crawl operation
///
/// Convenience wrapper around [`Coordinator::new`] and [`Coordinator::run`].
pub async fn run_crawl(config: Config) -> crate::Result<CrawlSummary> {
    Coordinator::new(config)?.run().await
}
