//! Site-Sentinel main entry point
//!
//! This is the command-line interface for the Site-Sentinel health crawler.

use anyhow::Context;
use clap::Parser;
use site_sentinel::browser::{Browser, ChromeBrowser};
use site_sentinel::config::{load_config_with_hash, Config};
use site_sentinel::crawler::Crawler;
use site_sentinel::output::print_summary;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Site-Sentinel: automated site health crawler
///
/// Site-Sentinel opens a site in a real browser, follows every same-origin
/// link up to a maximum depth, screenshots each page and logs navigation
/// failures, console errors and failing HTTP responses.
#[derive(Parser, Debug)]
#[command(name = "site-sentinel")]
#[command(version = "1.0.0")]
#[command(about = "Automated site health crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "site-sentinel.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without launching a browser
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config, config_hash).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("site_sentinel=info,warn"),
            1 => EnvFilter::new("site_sentinel=debug,info"),
            2 => EnvFilter::new("site_sentinel=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config) {
    println!("=== Site-Sentinel Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max depth: {}", config.crawler.max_depth);
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout_ms
    );
    println!(
        "  Concurrency batch size: {}",
        config.crawler.concurrency_batch_size
    );
    println!("  Network idle window: {}ms", config.crawler.network_idle_ms);

    println!("\nBrowser:");
    println!("  Headless: {}", config.browser.headless);
    println!(
        "  Viewport: {}x{}",
        config.browser.viewport_width, config.browser.viewport_height
    );
    println!(
        "  Ignore HTTPS errors: {}",
        config.browser.ignore_https_errors
    );
    match &config.browser.executable {
        Some(path) => println!("  Executable: {}", path.display()),
        None => println!("  Executable: (autodetect)"),
    }

    println!("\nOutput:");
    println!("  Logs: {}", config.output.log_dir.display());
    println!("  Screenshots: {}", config.output.screenshot_dir.display());

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
///
/// Page failures are part of the report; only setup failures return an error.
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let browser = ChromeBrowser::launch(&config.browser)
        .await
        .context("failed to launch browser")?;

    let outcome = run_crawl(config, config_hash, &browser).await;

    if let Err(e) = browser.close().await {
        tracing::warn!("Failed to close browser cleanly: {}", e);
    }

    outcome
}

async fn run_crawl(config: Config, config_hash: String, browser: &dyn Browser) -> anyhow::Result<()> {
    let crawler = Crawler::new(config, browser)
        .await
        .context("failed to set up crawler")?
        .with_config_hash(config_hash);

    let report = crawler.run().await;
    print_summary(&report);

    Ok(())
}
