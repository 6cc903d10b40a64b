//! Chromium backend driven over the DevTools protocol
//!
//! Each browsing context is a separate tab. Listener tasks per tab forward
//! `Network.responseReceived`, `Runtime.consoleAPICalled` and
//! `Log.entryAdded` to the crawler's event handler for the whole lifetime
//! of the tab, tagging every event with the URL the tab is showing at that
//! moment. The tab switches URL when the document of a navigation commits.

use crate::browser::{
    Browser, BrowserResult, BrowsingContext, ConsoleLevel, ConsoleMessage, NavigateOptions,
    NavigationResponse, PageEventHandler, ResponseEvent, WaitUntil,
};
use crate::config::BrowserConfig;
use crate::crawler::parse_anchor_hrefs;
use crate::BrowserError;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::log::{
    EnableParams as LogEnableParams, EventEntryAdded, LogEntryLevel,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams as NetworkEnableParams, EventResponseReceived, ResourceType,
};
use chromiumoxide::cdp::js_protocol::runtime::{
    ConsoleApiCalledType, EventConsoleApiCalled, RemoteObject,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Longest wait for the document response once the page has loaded
const DOCUMENT_GRACE: Duration = Duration::from_secs(5);

/// A launched Chromium instance
pub struct ChromeBrowser {
    browser: tokio::sync::Mutex<CdpBrowser>,
    handler_task: JoinHandle<()>,
}

impl ChromeBrowser {
    /// Launches Chromium with the given settings
    ///
    /// # Returns
    ///
    /// * `Ok(ChromeBrowser)` - Browser is running and its protocol handler is being polled
    /// * `Err(BrowserError::Launch)` - The executable could not be found or started
    pub async fn launch(settings: &BrowserConfig) -> BrowserResult<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .window_size(settings.viewport_width, settings.viewport_height)
            .viewport(Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
                ..Viewport::default()
            });

        if !settings.headless {
            builder = builder.with_head();
        }
        if settings.ignore_https_errors {
            builder = builder.arg("--ignore-certificate-errors");
        }
        if let Some(executable) = &settings.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = CdpBrowser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        // The protocol connection only makes progress while the handler is polled
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("Browser handler error: {}", e);
                }
            }
            tracing::debug!("Browser handler finished");
        });

        tracing::info!(
            "Launched Chromium ({}, viewport {}x{})",
            if settings.headless { "headless" } else { "headed" },
            settings.viewport_width,
            settings.viewport_height
        );

        Ok(Self {
            browser: tokio::sync::Mutex::new(browser),
            handler_task,
        })
    }
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn new_context(
        &self,
        handler: Arc<dyn PageEventHandler>,
    ) -> BrowserResult<Box<dyn BrowsingContext>> {
        let page = self
            .browser
            .lock()
            .await
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Context(e.to_string()))?;

        let context = ChromeContext::attach(page, handler).await?;
        Ok(Box::new(context))
    }

    async fn close(&self) -> BrowserResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| BrowserError::Launch(format!("close failed: {}", e)))?;
        browser.wait().await?;
        self.handler_task.abort();
        tracing::info!("Browser closed");
        Ok(())
    }
}

/// State shared between a tab and its listener tasks
#[derive(Debug)]
struct TabState {
    current_url: RwLock<String>,
    last_activity: Mutex<Instant>,
    /// Receives the first document response of the navigation in flight
    document: Mutex<Option<oneshot::Sender<NavigationResponse>>>,
}

impl TabState {
    fn new() -> Self {
        Self {
            current_url: RwLock::new("about:blank".to_string()),
            last_activity: Mutex::new(Instant::now()),
            document: Mutex::new(None),
        }
    }

    fn current_url(&self) -> String {
        self.current_url
            .read()
            .map(|url| url.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    fn set_current_url(&self, url: &str) {
        let mut current = self
            .current_url
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *current = url.to_string();
    }

    fn document(&self) -> MutexGuard<'_, Option<oneshot::Sender<NavigationResponse>>> {
        self.document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Opens the document slot; the receiver yields the navigation's response
    ///
    /// The tab keeps reporting its previous URL until the document commits.
    fn begin_navigation(&self) -> oneshot::Receiver<NavigationResponse> {
        let (tx, rx) = oneshot::channel();
        *self.document() = Some(tx);
        self.record_activity();
        rx
    }

    /// Hands the first document response after navigation start to the navigator
    ///
    /// Later document responses (frames, late redirects) only count as activity.
    fn offer_document(&self, url: &str, status: u16) {
        let Some(tx) = self.document().take() else {
            return;
        };
        self.set_current_url(url);
        let _ = tx.send(NavigationResponse {
            url: url.to_string(),
            status,
        });
    }

    /// Closes the document slot so late responses are ignored
    fn finish_navigation(&self) {
        self.document().take();
    }

    fn record_activity(&self) {
        let mut last = self
            .last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *last = Instant::now();
    }

    fn quiet_for(&self) -> Duration {
        self.last_activity
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .elapsed()
    }
}

/// One Chromium tab plus its event listeners
struct ChromeContext {
    page: Page,
    state: Arc<TabState>,
    listeners: Vec<JoinHandle<()>>,
}

impl ChromeContext {
    async fn attach(page: Page, handler: Arc<dyn PageEventHandler>) -> BrowserResult<Self> {
        page.execute(NetworkEnableParams::default())
            .await
            .map_err(|e| BrowserError::Context(format!("enable network events: {}", e)))?;

        let mut responses = page
            .event_listener::<EventResponseReceived>()
            .await
            .map_err(|e| BrowserError::Context(format!("subscribe to responses: {}", e)))?;
        let mut console = page
            .event_listener::<EventConsoleApiCalled>()
            .await
            .map_err(|e| BrowserError::Context(format!("subscribe to console: {}", e)))?;

        // Browser-generated errors (failed loads, CSP, mixed content) arrive on the Log domain
        page.execute(LogEnableParams::default())
            .await
            .map_err(|e| BrowserError::Context(format!("enable log events: {}", e)))?;
        let mut log_entries = page
            .event_listener::<EventEntryAdded>()
            .await
            .map_err(|e| BrowserError::Context(format!("subscribe to log entries: {}", e)))?;

        let state = Arc::new(TabState::new());

        let response_task = {
            let state = Arc::clone(&state);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                while let Some(event) = responses.next().await {
                    state.record_activity();
                    let status = u16::try_from(event.response.status).unwrap_or(0);
                    if matches!(event.r#type, ResourceType::Document) {
                        state.offer_document(&event.response.url, status);
                    }
                    handler.on_response(ResponseEvent {
                        url: event.response.url.clone(),
                        status,
                        page_url: state.current_url(),
                    });
                }
            })
        };

        let console_task = {
            let state = Arc::clone(&state);
            let handler = Arc::clone(&handler);
            tokio::spawn(async move {
                while let Some(event) = console.next().await {
                    let text = event
                        .args
                        .iter()
                        .filter_map(remote_object_text)
                        .collect::<Vec<_>>()
                        .join(" ");
                    handler.on_console_message(ConsoleMessage {
                        level: console_level(&event.r#type),
                        text,
                        page_url: state.current_url(),
                    });
                }
            })
        };

        let log_task = {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                while let Some(event) = log_entries.next().await {
                    handler.on_console_message(ConsoleMessage {
                        level: log_level(&event.entry.level),
                        text: event.entry.text.clone(),
                        page_url: state.current_url(),
                    });
                }
            })
        };

        Ok(Self {
            page,
            state,
            listeners: vec![response_task, console_task, log_task],
        })
    }

    /// Waits until no response has arrived for `idle`
    async fn wait_for_network_idle(&self, idle: Duration) {
        loop {
            let quiet = self.state.quiet_for();
            if quiet >= idle {
                return;
            }
            tokio::time::sleep(idle - quiet).await;
        }
    }
}

impl Drop for ChromeContext {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    async fn navigate(
        &self,
        url: &str,
        options: NavigateOptions,
    ) -> BrowserResult<Option<NavigationResponse>> {
        let deadline = tokio::time::Instant::now() + options.timeout;
        let document = self.state.begin_navigation();

        let load = async {
            self.page
                .goto(url)
                .await
                .map_err(|e| BrowserError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })?;
            if let WaitUntil::NetworkIdle { idle } = options.wait_until {
                self.wait_for_network_idle(idle).await;
            }
            Ok::<(), BrowserError>(())
        };

        let loaded = match tokio::time::timeout_at(deadline, load).await {
            Ok(loaded) => loaded,
            Err(_) => Err(BrowserError::Timeout(options.timeout)),
        };
        if let Err(e) = loaded {
            self.state.finish_navigation();
            return Err(e);
        }

        // The response listener runs on its own task and may lag behind the load event
        let remaining = deadline
            .saturating_duration_since(tokio::time::Instant::now())
            .min(DOCUMENT_GRACE);
        let response = await_document(document, remaining).await;
        self.state.finish_navigation();

        let final_url = self.current_url().await?;
        self.state.set_current_url(&final_url);

        Ok(response.map(|response| NavigationResponse {
            url: final_url,
            status: response.status,
        }))
    }

    async fn current_url(&self) -> BrowserResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| BrowserError::Dom(e.to_string()))?;
        Ok(url.unwrap_or_else(|| self.state.current_url()))
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> BrowserResult<()> {
        let params = ScreenshotParams::builder().full_page(full_page).build();
        let png = self
            .page
            .screenshot(params)
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        tokio::fs::write(path, png).await?;
        Ok(())
    }

    async fn anchor_hrefs(&self) -> BrowserResult<Vec<Option<String>>> {
        let html = self
            .page
            .content()
            .await
            .map_err(|e| BrowserError::Dom(e.to_string()))?;
        Ok(parse_anchor_hrefs(&html))
    }
}

/// Waits up to `limit` for the document response of the navigation in flight
async fn await_document(
    document: oneshot::Receiver<NavigationResponse>,
    limit: Duration,
) -> Option<NavigationResponse> {
    match tokio::time::timeout(limit, document).await {
        Ok(Ok(response)) => Some(response),
        _ => None,
    }
}

fn log_level(level: &LogEntryLevel) -> ConsoleLevel {
    match level {
        LogEntryLevel::Error => ConsoleLevel::Error,
        LogEntryLevel::Warning => ConsoleLevel::Warning,
        LogEntryLevel::Info => ConsoleLevel::Info,
        _ => ConsoleLevel::Debug,
    }
}

fn console_level(kind: &ConsoleApiCalledType) -> ConsoleLevel {
    match kind {
        ConsoleApiCalledType::Error => ConsoleLevel::Error,
        ConsoleApiCalledType::Warning => ConsoleLevel::Warning,
        ConsoleApiCalledType::Info => ConsoleLevel::Info,
        ConsoleApiCalledType::Debug => ConsoleLevel::Debug,
        _ => ConsoleLevel::Log,
    }
}

/// Renders a console argument the way devtools prints it
fn remote_object_text(arg: &RemoteObject) -> Option<String> {
    if let Some(value) = &arg.value {
        return Some(
            value
                .as_str()
                .map(str::to_owned)
                .unwrap_or_else(|| value.to_string()),
        );
    }
    arg.description.clone()
}
