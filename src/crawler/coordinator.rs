//! Crawler coordinator - the recursive traversal engine
//!
//! A branch is one `(url, depth)` pair. Each branch:
//! 1. passes the eligibility gate (non-empty, within depth, first claim)
//! 2. navigates a leased browsing context and waits for network quiescence
//! 3. captures a full-page screenshot
//! 4. extracts same-origin links
//! 5. crawls its children in fixed-size batches, each batch settling fully
//!    before the next one starts
//!
//! Any failure in steps 2-4 ends that branch only: it is marked failed,
//! written to the crawl error log, and never propagates to the parent,
//! siblings or the run.

use crate::browser::{Browser, BrowsingContext, NavigateOptions, PageEventHandler, WaitUntil};
use crate::config::Config;
use crate::crawler::parser::extract_links;
use crate::crawler::pool::ContextPool;
use crate::output::{write_summary, CrawlReport, ErrorLog, FailureRecorder, ScreenshotNamer};
use crate::state::{CrawlTarget, DedupStore, PageOutcome};
use crate::url::{normalize_url, origin_of};
use crate::{NavigationError, SentinelError};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Main crawler structure
///
/// Owns the dedup store, the browsing-context pool and the failure
/// recorder for exactly one run.
pub struct Crawler {
    config: Arc<Config>,
    dedup: DedupStore,
    pool: ContextPool,
    recorder: Arc<FailureRecorder>,
    screenshots: ScreenshotNamer,
    config_hash: Option<String>,
}

impl Crawler {
    /// Creates a crawler bound to `browser`
    ///
    /// Creates the output directories, starts the error log writer and
    /// opens one browsing context per concurrency slot.
    ///
    /// # Returns
    ///
    /// * `Ok(Crawler)` - Ready to run
    /// * `Err(SentinelError)` - Output directories or browsing contexts could not be set up
    pub async fn new(config: Config, browser: &dyn Browser) -> Result<Self, SentinelError> {
        std::fs::create_dir_all(&config.output.log_dir)?;
        std::fs::create_dir_all(&config.output.screenshot_dir)?;

        let recorder = Arc::new(FailureRecorder::new(ErrorLog::spawn(
            config.output.log_dir.clone(),
        )));
        let handler: Arc<dyn PageEventHandler> = recorder.clone();

        let pool = ContextPool::open(
            browser,
            config.crawler.concurrency_batch_size,
            handler,
        )
        .await?;

        Ok(Self {
            screenshots: ScreenshotNamer::new(config.output.screenshot_dir.clone()),
            config: Arc::new(config),
            dedup: DedupStore::new(),
            pool,
            recorder,
            config_hash: None,
        })
    }

    /// Attaches the configuration file hash to the report
    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Crawls from the configured base URL and produces the report
    ///
    /// Individual page failures never make this fail; they are reflected in
    /// the report and the error logs.
    pub async fn run(&self) -> CrawlReport {
        let start_time = Instant::now();
        let seed = self.config.crawler.base_url.clone();

        tracing::info!(
            "Starting crawl from: {} (max depth {}, batch size {}, {} browsing contexts)",
            seed,
            self.config.crawler.max_depth,
            self.config.crawler.concurrency_batch_size,
            self.pool.size()
        );

        self.crawl(&seed).await;

        // Every failure queued during the traversal must be on disk before the summary
        self.recorder.flush().await;

        let mut report = CrawlReport::from_snapshot(self.dedup.snapshot(), start_time.elapsed());
        if let Some(hash) = &self.config_hash {
            report = report.with_config_hash(hash.clone());
        }

        if let Err(e) = write_summary(&report, &self.config.output.log_dir) {
            tracing::error!(
                "Failed to write crawl summary to {}: {}",
                self.config.output.log_dir.display(),
                e
            );
        }

        tracing::info!(
            "Crawl completed: {} visited, {} failed, {:.1}% success in {:?}",
            report.visited_count,
            report.failed_count,
            report.success_rate,
            report.duration
        );

        report
    }

    /// Crawls the traversal tree rooted at `seed_url`, returning once it has fully settled
    pub async fn crawl(&self, seed_url: &str) {
        self.crawl_branch(CrawlTarget::seed(seed_url)).await;
    }

    /// Read access to the visited/failed state
    pub fn dedup(&self) -> &DedupStore {
        &self.dedup
    }

    /// Crawls one branch and all of its descendants
    fn crawl_branch(&self, target: CrawlTarget) -> BoxFuture<'_, ()> {
        async move {
            let Some(url) = self.admit(&target) else {
                return;
            };

            tracing::info!("Crawling (depth {}): {}", target.depth, url);

            match self.visit(&url).await {
                PageOutcome::Success { links } => {
                    tracing::info!("Found {} internal links on {}", links.len(), url);
                    self.crawl_children(&target, links).await;
                }
                PageOutcome::Failure { reason } => {
                    tracing::warn!("Failed to crawl: {} {}", url, reason);
                    self.dedup.mark_failed(&url);
                    self.recorder.navigation_failure(&url, &reason);
                }
            }
        }
        .boxed()
    }

    /// Eligibility gate
    ///
    /// Returns the dedup key to crawl, or `None` if the branch must stop:
    /// empty URL, depth beyond the maximum, or already claimed. The depth
    /// check comes before the claim so a URL first seen too deep can still
    /// be crawled when it is reached by a shorter path.
    fn admit(&self, target: &CrawlTarget) -> Option<String> {
        if target.url.trim().is_empty() || target.depth > self.config.crawler.max_depth {
            return None;
        }

        // Unparseable URLs are claimed verbatim so they still fail once, visibly
        let key = normalize_url(&target.url)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| target.url.clone());

        self.dedup.claim(&key).then_some(key)
    }

    /// Runs steps 2-4 for one URL on a leased context
    ///
    /// The lease is released when this returns, before any child branch
    /// starts, so nested batches never wait on contexts held by ancestors.
    async fn visit(&self, url: &str) -> PageOutcome {
        let lease = match self.pool.acquire().await {
            Ok(lease) => lease,
            Err(e) => {
                return PageOutcome::Failure {
                    reason: e.to_string(),
                }
            }
        };

        match self.visit_with(lease.context(), url).await {
            Ok(links) => PageOutcome::Success { links },
            Err(e) => PageOutcome::Failure {
                reason: e.to_string(),
            },
        }
    }

    async fn visit_with(
        &self,
        context: &dyn BrowsingContext,
        url: &str,
    ) -> Result<Vec<String>, NavigationError> {
        let target = normalize_url(url)?;

        let options = NavigateOptions {
            wait_until: self.wait_until(),
            timeout: self.config.crawler.navigation_timeout(),
        };

        // The per-attempt timeout holds even if the backend ignores it
        let response = tokio::time::timeout(options.timeout, context.navigate(url, options))
            .await
            .map_err(|_| NavigationError::Timeout(self.config.crawler.navigation_timeout_ms))??;

        let response = response.ok_or(NavigationError::NoResponse)?;
        if !response.ok() {
            return Err(NavigationError::Status(response.status));
        }

        let screenshot_path = self.screenshots.path_for(url);
        context.screenshot(&screenshot_path, true).await?;
        tracing::debug!("Saved screenshot {}", screenshot_path.display());

        let page_url = context.current_url().await?;
        let base = Url::parse(&page_url).unwrap_or_else(|_| target.clone());
        let hrefs = context.anchor_hrefs().await?;

        Ok(extract_links(&hrefs, &base, &origin_of(&target)))
    }

    /// A zero idle window means the load event alone ends a navigation
    fn wait_until(&self) -> WaitUntil {
        let idle = self.config.crawler.network_idle();
        if idle.is_zero() {
            WaitUntil::Load
        } else {
            WaitUntil::NetworkIdle { idle }
        }
    }

    /// Crawls child links in batches of `concurrency_batch_size`
    ///
    /// All branches of a batch run concurrently and the whole batch settles
    /// before the next one starts. Branches contain their own failures, so
    /// one sibling never cuts another short.
    async fn crawl_children(&self, parent: &CrawlTarget, links: Vec<String>) {
        let batch_size = self.config.crawler.concurrency_batch_size.max(1);

        for batch in links.chunks(batch_size) {
            join_all(
                batch
                    .iter()
                    .map(|link| self.crawl_branch(parent.child(link.clone()))),
            )
            .await;
        }
    }
}
