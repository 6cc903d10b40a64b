//! Crawler module for the site traversal
//!
//! This module contains the core crawling logic, including:
//! - The recursive, depth-bounded, batched traversal
//! - Link extraction from rendered pages
//! - The pool of browsing contexts shared by concurrent branches

mod coordinator;
mod parser;
mod pool;

pub use coordinator::Crawler;
pub use parser::{extract_links, parse_anchor_hrefs};
pub use pool::{ContextLease, ContextPool};

use crate::browser::Browser;
use crate::config::Config;
use crate::output::CrawlReport;

/// Runs a complete crawl operation
///
/// This is the main entry point for a crawl. It will:
/// 1. Create the output directories and start the error log writer
/// 2. Open one browsing context per concurrency slot
/// 3. Crawl from the configured base URL until the traversal settles
/// 4. Write the summary and return the report
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `browser` - The browser the contexts are opened on
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl ran to completion (pages may still have failed)
/// * `Err(SentinelError)` - Crawl could not be set up
pub async fn crawl(config: Config, browser: &dyn Browser) -> crate::Result<CrawlReport> {
    let crawler = Crawler::new(config, browser).await?;
    Ok(crawler.run().await)
}
