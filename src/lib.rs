//! Site-Sentinel: a browser-driven site health crawler
//!
//! This crate crawls a web site from a base URL through a real browser,
//! visiting every same-origin page once up to a maximum depth. Navigation
//! failures, console errors and failing sub-resource responses are logged
//! per category, every successful page is screenshotted, and the run ends
//! with a visitation report.

pub mod browser;
pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod url;

use std::time::Duration;
use thiserror::Error;

/// Main error type for Site-Sentinel operations
///
/// These are setup failures (configuration, browser launch, output
/// directories). Anything that goes wrong while a single page
/// is being crawled is contained in that branch as a [`NavigationError`].
#[derive(Debug, Error)]
pub enum SentinelError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Errors reported by the browser collaborator
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to open browsing context: {0}")]
    Context(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("DOM query failed: {0}")]
    Dom(String),

    #[error("No browsing context available")]
    PoolExhausted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Terminal failure of a single crawl branch
///
/// The `Display` output is exactly what ends up in the crawl error log.
#[derive(Debug, Error)]
pub enum NavigationError {
    #[error("Navigation timed out after {0}ms")]
    Timeout(u64),

    #[error("HTTP unknown")]
    NoResponse,

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Url(#[from] UrlError),

    #[error("{0}")]
    Browser(#[from] BrowserError),
}

/// Result type alias for Site-Sentinel operations
pub type Result<T> = std::result::Result<T, SentinelError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::Crawler;
pub use output::CrawlReport;
pub use state::{DedupStore, PageOutcome};
