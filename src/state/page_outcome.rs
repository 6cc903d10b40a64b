//! Outcome and work-item types for a single crawl branch

use std::fmt;

/// A URL scheduled for crawling at a given depth
///
/// The seed is depth 0; a link found on a page at depth `d` is a target at
/// depth `d + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTarget {
    pub url: String,
    pub depth: u32,
}

impl CrawlTarget {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
        }
    }

    /// Creates the target for a link discovered on this target's page
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
        }
    }
}

impl fmt::Display for CrawlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (depth {})", self.url, self.depth)
    }
}

/// Result of attempting one crawl target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Page loaded and was captured; `links` are the same-origin links found on it
    Success { links: Vec<String> },

    /// Page could not be crawled
    Failure { reason: String },
}

impl PageOutcome {
    /// Returns true if this represents a successful visit
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
