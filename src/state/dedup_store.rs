//! Visited/failed bookkeeping shared by all crawl branches
//!
//! Every branch asks the store for permission before touching the network.
//! `claim` is the only check-and-insert in the crawler, so it runs under a
//! single lock; that is what guarantees at most one attempt per URL while
//! sibling branches run concurrently.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Inner {
    visited: HashSet<String>,
    failed: HashSet<String>,
    /// Claim order, for the report
    visited_order: Vec<String>,
    /// Failure order, for the report
    failed_order: Vec<String>,
}

/// Thread-safe record of attempted and failed URLs for one crawl run
///
/// Entries are never removed. A URL in `failed` is always also in
/// `visited`, because it is claimed before its outcome is known.
#[derive(Debug, Default)]
pub struct DedupStore {
    inner: Mutex<Inner>,
}

/// Point-in-time copy of the store, in insertion order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DedupSnapshot {
    pub visited: Vec<String>,
    pub failed: Vec<String>,
}

impl DedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The sets stay consistent even if a holder panicked mid-crawl
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Atomically claims `url` for crawling
    ///
    /// Returns `true` if the URL was neither visited nor failed, in which
    /// case it is now recorded as visited and the caller must crawl it.
    /// Returns `false` if any branch has already claimed it.
    pub fn claim(&self, url: &str) -> bool {
        let mut inner = self.lock();
        if inner.visited.contains(url) || inner.failed.contains(url) {
            return false;
        }
        inner.visited.insert(url.to_string());
        inner.visited_order.push(url.to_string());
        true
    }

    /// Records that a claimed URL failed terminally
    ///
    /// URLs that were never claimed, or that already failed, are ignored.
    pub fn mark_failed(&self, url: &str) {
        let mut inner = self.lock();
        if !inner.visited.contains(url) {
            tracing::warn!("Ignoring failure for unclaimed URL: {}", url);
            return;
        }
        if inner.failed.insert(url.to_string()) {
            inner.failed_order.push(url.to_string());
        }
    }

    pub fn is_visited(&self, url: &str) -> bool {
        self.lock().visited.contains(url)
    }

    pub fn is_failed(&self, url: &str) -> bool {
        self.lock().failed.contains(url)
    }

    pub fn visited_count(&self) -> usize {
        self.lock().visited.len()
    }

    pub fn failed_count(&self) -> usize {
        self.lock().failed.len()
    }

    /// Copies the current contents, preserving claim and failure order
    pub fn snapshot(&self) -> DedupSnapshot {
        let inner = self.lock();
        DedupSnapshot {
            visited: inner.visited_order.clone(),
            failed: inner.failed_order.clone(),
        }
    }
}
