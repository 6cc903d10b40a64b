//! Screenshot file naming
//!
//! Screenshots are named after the page URL so a directory listing reads
//! like a site map; a per-capture token keeps structurally similar URLs
//! from overwriting each other.

use chrono::Utc;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Longest sanitized URL kept in a file name, before the token
pub const MAX_SANITIZED_LEN: usize = 100;

/// Turns a URL into a file-name-safe stem
///
/// Strips a leading `http://` or `https://`, replaces every character
/// outside `[A-Za-z0-9.-]` with `_`, and truncates to
/// [`MAX_SANITIZED_LEN`] characters.
///
/// # Example
///
/// ```
/// use site_sentinel::output::sanitize_url;
///
/// assert_eq!(sanitize_url("https://example.com/a?b=c"), "example.com_a_b_c");
/// ```
pub fn sanitize_url(url: &str) -> String {
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);

    stripped
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_SANITIZED_LEN)
        .collect()
}

/// Hands out unique screenshot paths inside one directory
#[derive(Debug)]
pub struct ScreenshotNamer {
    dir: PathBuf,
    sequence: AtomicU64,
}

impl ScreenshotNamer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sequence: AtomicU64::new(0),
        }
    }

    /// Returns `<dir>/<sanitized-url>_<millis>-<sequence>.png`
    pub fn path_for(&self, url: &str) -> PathBuf {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let token = format!("{}-{}", Utc::now().timestamp_millis(), sequence);
        self.dir
            .join(format!("{}_{}.png", sanitize_url(url), token))
    }
}
