use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Sentinel
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Seed URL; its origin bounds the crawl
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum depth to crawl, the seed being depth 0
    #[serde(rename = "max-depth")]
    pub max_depth: u32,

    /// Per-attempt navigation timeout (milliseconds)
    #[serde(rename = "navigation-timeout-ms", default = "default_navigation_timeout_ms")]
    pub navigation_timeout_ms: u64,

    /// Number of sibling branches crawled together
    #[serde(rename = "concurrency-batch-size", default = "default_batch_size")]
    pub concurrency_batch_size: usize,

    /// Quiet period without network responses that counts as "idle" (milliseconds)
    #[serde(rename = "network-idle-ms", default = "default_network_idle_ms")]
    pub network_idle_ms: u64,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn network_idle(&self) -> Duration {
        Duration::from_millis(self.network_idle_ms)
    }
}

/// Browser launch configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Run without a visible window
    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(rename = "viewport-width", default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height", default = "default_viewport_height")]
    pub viewport_height: u32,

    /// Accept invalid or self-signed TLS certificates
    #[serde(rename = "ignore-https-errors", default = "default_true")]
    pub ignore_https_errors: bool,

    /// Explicit Chromium executable; autodetected when absent
    #[serde(default)]
    pub executable: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            ignore_https_errors: true,
            executable: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory for the failure logs and the crawl summary
    #[serde(rename = "log-dir", default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Directory for page screenshots
    #[serde(rename = "screenshot-dir", default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

fn default_navigation_timeout_ms() -> u64 {
    30_000
}

fn default_batch_size() -> usize {
    3
}

fn default_network_idle_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_viewport_width() -> u32 {
    1280
}

fn default_viewport_height() -> u32 {
    720
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from("screenshots")
}
