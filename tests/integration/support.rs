//! Scripted in-memory browser for end-to-end crawl tests
//!
//! Every page of the fake site is described up front: the status of its
//! top-level response, the anchors it renders, the console messages and
//! sub-resource responses it produces, any events it emits after it has
//! been left, and how long it takes to load. The
//! browser records every navigation so tests can assert on ordering,
//! concurrency and per-context exclusivity.

use async_trait::async_trait;
use site_sentinel::browser::{
    Browser, BrowserResult, BrowsingContext, ConsoleLevel, ConsoleMessage, NavigateOptions,
    NavigationResponse, PageEventHandler, ResponseEvent,
};
use site_sentinel::config::{BrowserConfig, Config, CrawlerConfig, OutputConfig};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub const ORIGIN: &str = "https://example.com";

/// Absolute URL on the fake site
pub fn page(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

/// Creates a test configuration writing into `dir`
pub fn create_test_config(dir: &Path, max_depth: u32, batch_size: usize) -> Config {
    Config {
        crawler: CrawlerConfig {
            base_url: page("/"),
            max_depth,
            navigation_timeout_ms: 1000,
            concurrency_batch_size: batch_size,
            network_idle_ms: 0,
        },
        browser: BrowserConfig::default(),
        output: OutputConfig {
            log_dir: dir.join("logs"),
            screenshot_dir: dir.join("screenshots"),
        },
    }
}

/// Event a page emits some time after its own navigation finished
#[derive(Debug, Clone)]
pub enum LateEvent {
    ConsoleError(String),
    Response { url: String, status: u16 },
}

/// Script for one page of the fake site
#[derive(Debug, Clone)]
pub struct FakePage {
    /// `None` means the navigation produces no top-level response
    pub status: Option<u16>,
    pub hrefs: Vec<Option<String>>,
    pub console: Vec<(ConsoleLevel, String)>,
    pub responses: Vec<(String, u16)>,
    /// Emitted after the given delay, from whatever the context then shows
    pub late: Vec<(Duration, LateEvent)>,
    pub delay: Duration,
    /// Never finishes loading
    pub hang: bool,
}

impl FakePage {
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            hrefs: vec![],
            console: vec![],
            responses: vec![],
            late: vec![],
            delay: Duration::from_millis(100),
            hang: false,
        }
    }

    pub fn no_response() -> Self {
        Self {
            status: None,
            ..Self::ok()
        }
    }

    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::ok()
        }
    }

    pub fn links(mut self, hrefs: &[&str]) -> Self {
        self.hrefs
            .extend(hrefs.iter().map(|href| Some(href.to_string())));
        self
    }

    pub fn unreadable_anchor(mut self) -> Self {
        self.hrefs.push(None);
        self
    }

    pub fn console(mut self, level: ConsoleLevel, text: &str) -> Self {
        self.console.push((level, text.to_string()));
        self
    }

    pub fn late(mut self, after: Duration, event: LateEvent) -> Self {
        self.late.push((after, event));
        self
    }

    pub fn sub_resource(mut self, url: &str, status: u16) -> Self {
        self.responses.push((url.to_string(), status));
        self
    }
}

/// One completed or abandoned navigation
#[derive(Debug, Clone)]
pub struct NavigationRecord {
    pub url: String,
    pub context: usize,
    pub started: Instant,
    pub finished: Option<Instant>,
}

#[derive(Debug, Default)]
struct Activity {
    records: Vec<NavigationRecord>,
    active: usize,
    peak: usize,
    busy_contexts: HashSet<usize>,
    overlapping_context_use: bool,
}

/// Shared observation log of everything the fake browser did
#[derive(Debug, Default)]
pub struct Observations {
    activity: Mutex<Activity>,
    contexts_opened: AtomicUsize,
}

impl Observations {
    pub fn navigations(&self) -> Vec<NavigationRecord> {
        self.activity.lock().unwrap().records.clone()
    }

    pub fn navigated_urls(&self) -> Vec<String> {
        self.navigations().into_iter().map(|r| r.url).collect()
    }

    pub fn navigation_count(&self, url: &str) -> usize {
        self.navigations().iter().filter(|r| r.url == url).count()
    }

    /// Highest number of navigations in flight at once
    pub fn peak_concurrency(&self) -> usize {
        self.activity.lock().unwrap().peak
    }

    /// True if any context ever had two navigations in flight
    pub fn overlapping_context_use(&self) -> bool {
        self.activity.lock().unwrap().overlapping_context_use
    }

    pub fn contexts_opened(&self) -> usize {
        self.contexts_opened.load(Ordering::SeqCst)
    }

    fn begin(&self, url: &str, context: usize) -> usize {
        let mut activity = self.activity.lock().unwrap();
        if !activity.busy_contexts.insert(context) {
            activity.overlapping_context_use = true;
        }
        activity.active += 1;
        activity.peak = activity.peak.max(activity.active);
        activity.records.push(NavigationRecord {
            url: url.to_string(),
            context,
            started: Instant::now(),
            finished: None,
        });
        activity.records.len() - 1
    }

    fn end(&self, index: usize, context: usize, completed: bool) {
        let mut activity = self.activity.lock().unwrap();
        activity.active -= 1;
        activity.busy_contexts.remove(&context);
        if completed {
            activity.records[index].finished = Some(Instant::now());
        }
    }
}

/// Keeps the in-flight bookkeeping right even when a navigation is cancelled
struct InFlight<'a> {
    observations: &'a Observations,
    index: usize,
    context: usize,
    completed: bool,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.observations
            .end(self.index, self.context, self.completed);
    }
}

/// In-memory browser serving a scripted site
pub struct FakeBrowser {
    pages: Arc<HashMap<String, FakePage>>,
    observations: Arc<Observations>,
}

impl FakeBrowser {
    pub fn new(pages: Vec<(String, FakePage)>) -> Self {
        Self {
            pages: Arc::new(pages.into_iter().collect()),
            observations: Arc::new(Observations::default()),
        }
    }

    pub fn observations(&self) -> Arc<Observations> {
        Arc::clone(&self.observations)
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn new_context(
        &self,
        handler: Arc<dyn PageEventHandler>,
    ) -> BrowserResult<Box<dyn BrowsingContext>> {
        let id = self.observations.contexts_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeContext {
            id,
            pages: Arc::clone(&self.pages),
            observations: Arc::clone(&self.observations),
            handler,
            current_url: Arc::new(Mutex::new("about:blank".to_string())),
        }))
    }

    async fn close(&self) -> BrowserResult<()> {
        Ok(())
    }
}

struct FakeContext {
    id: usize,
    pages: Arc<HashMap<String, FakePage>>,
    observations: Arc<Observations>,
    handler: Arc<dyn PageEventHandler>,
    current_url: Arc<Mutex<String>>,
}

impl FakeContext {
    /// Emits `event` after `after`, tagged with the URL shown at that moment
    fn schedule_late(&self, after: Duration, event: LateEvent) {
        let handler = Arc::clone(&self.handler);
        let current_url = Arc::clone(&self.current_url);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            let page_url = current_url.lock().unwrap().clone();
            match event {
                LateEvent::ConsoleError(text) => handler.on_console_message(ConsoleMessage {
                    level: ConsoleLevel::Error,
                    text,
                    page_url,
                }),
                LateEvent::Response { url, status } => handler.on_response(ResponseEvent {
                    url,
                    status,
                    page_url,
                }),
            }
        });
    }
}

#[async_trait]
impl BrowsingContext for FakeContext {
    async fn navigate(
        &self,
        url: &str,
        _options: NavigateOptions,
    ) -> BrowserResult<Option<NavigationResponse>> {
        let mut in_flight = InFlight {
            observations: &self.observations,
            index: self.observations.begin(url, self.id),
            context: self.id,
            completed: false,
        };

        // Unknown pages behave like a server 404
        let script = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| FakePage::with_status(404));

        *self.current_url.lock().unwrap() = url.to_string();

        if script.hang {
            futures::future::pending::<()>().await;
        }
        tokio::time::sleep(script.delay).await;

        for (level, text) in &script.console {
            self.handler.on_console_message(ConsoleMessage {
                level: *level,
                text: text.clone(),
                page_url: url.to_string(),
            });
        }
        if let Some(status) = script.status {
            self.handler.on_response(ResponseEvent {
                url: url.to_string(),
                status,
                page_url: url.to_string(),
            });
        }
        for (resource, status) in &script.responses {
            self.handler.on_response(ResponseEvent {
                url: resource.clone(),
                status: *status,
                page_url: url.to_string(),
            });
        }

        for (after, event) in &script.late {
            self.schedule_late(*after, event.clone());
        }

        in_flight.completed = true;
        Ok(script.status.map(|status| NavigationResponse {
            url: url.to_string(),
            status,
        }))
    }

    async fn current_url(&self) -> BrowserResult<String> {
        Ok(self.current_url.lock().unwrap().clone())
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> BrowserResult<()> {
        std::fs::write(path, b"\x89PNG\r\n\x1a\n")?;
        Ok(())
    }

    async fn anchor_hrefs(&self) -> BrowserResult<Vec<Option<String>>> {
        let url = self.current_url.lock().unwrap().clone();
        Ok(self
            .pages
            .get(&url)
            .map(|page| page.hrefs.clone())
            .unwrap_or_default())
    }
}
