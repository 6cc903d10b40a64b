//! Browser collaborator interface
//!
//! The crawler never talks to a browser engine directly. It opens
//! independent browsing contexts through [`Browser`] and drives each one
//! through [`BrowsingContext`]. Console messages and network responses
//! flow the other way, into a [`PageEventHandler`] registered once per
//! context when it is opened.
//!
//! [`chrome::ChromeBrowser`] is the Chromium implementation used by the CLI.

pub mod chrome;

use crate::BrowserError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub use chrome::ChromeBrowser;

/// Result type for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The load event fired
    Load,
    /// The load event fired and the network has been quiet for `idle`
    NetworkIdle { idle: Duration },
}

/// Options for a single navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    pub timeout: Duration,
}

/// Top-level response of a navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationResponse {
    /// Final URL after redirects
    pub url: String,
    pub status: u16,
}

impl NavigationResponse {
    /// Mirrors the browser notion of an "ok" response: status 200-299
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Severity of a console message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
    Debug,
    Log,
}

/// A console message emitted by a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleMessage {
    pub level: ConsoleLevel,
    pub text: String,
    /// URL the emitting context was showing when the message arrived
    pub page_url: String,
}

/// A network response observed by a context, for the document or any sub-resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseEvent {
    pub url: String,
    pub status: u16,
    /// URL the receiving context was showing when the response arrived
    pub page_url: String,
}

/// Receives page events from every browsing context
///
/// Events may arrive at any time, from any task, including after the branch
/// that navigated the context has moved on. Implementations must return
/// quickly and must not fail.
pub trait PageEventHandler: Send + Sync {
    fn on_console_message(&self, message: ConsoleMessage);

    fn on_response(&self, response: ResponseEvent);
}

/// A browser able to open independent browsing contexts
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a new context (tab) whose events are delivered to `handler`
    async fn new_context(
        &self,
        handler: Arc<dyn PageEventHandler>,
    ) -> BrowserResult<Box<dyn BrowsingContext>>;

    /// Shuts the browser down
    async fn close(&self) -> BrowserResult<()>;
}

/// One browsing context. Operations on a context are issued by one branch at a time.
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Navigates to `url`
    ///
    /// Returns `Ok(None)` if the navigation produced no top-level response.
    async fn navigate(
        &self,
        url: &str,
        options: NavigateOptions,
    ) -> BrowserResult<Option<NavigationResponse>>;

    /// URL currently shown by this context
    async fn current_url(&self) -> BrowserResult<String>;

    /// Captures the current page as a PNG at `path`
    async fn screenshot(&self, path: &Path, full_page: bool) -> BrowserResult<()>;

    /// Raw `href` attribute of every anchor on the current page, in DOM order
    ///
    /// `None` marks an anchor whose href could not be read.
    async fn anchor_hrefs(&self) -> BrowserResult<Vec<Option<String>>>;
}
