//! Site-Harvest main entry point
//!
//! This is the command-line interface for the Site-Harvest site mirror.

use anyhow::{bail, Context};
use clap::Parser;
use site_harvest::config::{load_config_with_hash, validate, Config};
use site_harvest::crawler::Coordinator;
use site_harvest::normalize_url;
use site_harvest::output::{generate_markdown_summary, print_summary};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Site-Harvest: a bounded site mirror
///
/// Site-Harvest crawls one website breadth-first, saves the content regions of
/// every page under a route-derived file tree, and mirrors the images they
/// reference, downloading each image once.
#[derive(Parser, Debug)]
#[command(name = "site-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A bounded site mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Output root directory (overrides [output] root)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Delay between requests per worker, in seconds (overrides [crawler] delay-ms)
    #[arg(short, long, value_name = "SECS")]
    delay: Option<f64>,

    /// Maximum number of pages to visit (overrides [crawler] max-pages)
    #[arg(short, long, value_name = "N")]
    max_pages: Option<u32>,

    /// Only visit the seed URLs, without following links
    #[arg(short, long)]
    seed_only: bool,

    /// Number of concurrent workers (overrides [crawler] workers)
    #[arg(short, long, value_name = "N")]
    workers: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli)?;

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_harvest=info,warn"),
            1 => EnvFilter::new("site_harvest=debug,info"),
            2 => EnvFilter::new("site_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides and re-validates the result
fn apply_overrides(config: &mut Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(output) = &cli.output {
        config.output.root = output.to_string_lossy().into_owned();
    }
    if let Some(delay) = cli.delay {
        if !delay.is_finite() || delay < 0.0 {
            bail!("Delay must be a non-negative number of seconds, got {}", delay);
        }
        config.crawler.delay_ms = (delay * 1000.0).round() as u64;
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages = Some(max_pages);
    }
    if cli.seed_only {
        config.crawler.seeds_only = true;
    }
    if let Some(workers) = cli.workers {
        config.crawler.workers = workers;
    }

    validate(config).context("Invalid command-line override")?;
    Ok(())
}

/// Handles the --dry-run mode: shows the effective configuration and seeds
fn handle_dry_run(config: &Config) {
    println!("=== Site-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Delay: {}ms per worker", config.crawler.delay_ms);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    match config.crawler.max_pages {
        Some(max) => println!("  Max pages: {}", max),
        None => println!("  Max pages: unlimited"),
    }
    println!("  Seeds only: {}", config.crawler.seeds_only);
    println!("  Workers: {}", config.crawler.workers);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Root: {}", config.output.root);
    if let Some(summary) = &config.output.summary_path {
        println!("  Summary: {}", summary);
    }

    println!("\nSite:");
    println!("  Hosts: {}", config.site.hosts.join(", "));
    println!(
        "  Excluded extensions: {}",
        config.site.excluded_extensions.join(" ")
    );
    println!(
        "  Excluded prefixes: {}",
        config.site.excluded_prefixes.join(" ")
    );
    println!(
        "  Whole-document fallback: {}",
        config.extraction.fallback_to_document
    );

    println!("\nSeeds ({}):", config.site.seeds.len());
    for seed in &config.site.seeds {
        match normalize_url(seed) {
            Ok(url) => println!("  - {}", url),
            Err(e) => println!("  - {} (invalid: {})", seed, e),
        }
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let summary_path = config.output.summary_path.clone();
    let output_root = PathBuf::from(&config.output.root);

    tracing::info!(
        "Hosts: {}, seeds: {}, output: {}",
        config.site.hosts.join(", "),
        config.site.seeds.len(),
        output_root.display()
    );

    let summary = Coordinator::new(config)
        .context("Failed to initialize crawler")?
        .with_config_hash(config_hash)
        .run()
        .await
        .context("Crawl failed")?;

    println!();
    print_summary(&summary);

    if let Some(path) = summary_path {
        generate_markdown_summary(&summary, Path::new(&path))
            .with_context(|| format!("Failed to write summary to {}", path))?;
        println!("\n✓ Summary written to: {}", path);
    }

    let absolute_root = std::fs::canonicalize(&output_root).unwrap_or(output_root);
    println!("\nOutput directory: {}", absolute_root.display());
    println!("Total pages visited: {}", summary.pages_visited);

    Ok(())
}
