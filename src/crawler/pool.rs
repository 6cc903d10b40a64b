//! Pool of independent browsing contexts
//!
//! Concurrent branches must never navigate the same tab. The pool owns a
//! fixed set of contexts and a semaphore with one permit per context: a
//! branch waits for a permit, takes a context, and the lease puts the
//! context back when dropped.

use crate::browser::{Browser, BrowsingContext, PageEventHandler};
use crate::BrowserError;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Semaphore, SemaphorePermit};

/// Fixed-size set of browsing contexts shared by all crawl branches
pub struct ContextPool {
    idle: Mutex<Vec<Box<dyn BrowsingContext>>>,
    permits: Semaphore,
    size: usize,
}

/// Exclusive use of one context until dropped
pub struct ContextLease<'a> {
    context: Option<Box<dyn BrowsingContext>>,
    pool: &'a ContextPool,
    _permit: SemaphorePermit<'a>,
}

impl ContextPool {
    /// Opens `size` contexts on `browser`, all reporting to `handler`
    pub async fn open(
        browser: &dyn Browser,
        size: usize,
        handler: Arc<dyn PageEventHandler>,
    ) -> Result<Self, BrowserError> {
        let mut contexts = Vec::with_capacity(size);
        for _ in 0..size {
            contexts.push(browser.new_context(Arc::clone(&handler)).await?);
        }
        tracing::debug!("Opened {} browsing contexts", size);
        Ok(Self::from_contexts(contexts))
    }

    /// Builds a pool from already opened contexts
    pub fn from_contexts(contexts: Vec<Box<dyn BrowsingContext>>) -> Self {
        let size = contexts.len();
        Self {
            idle: Mutex::new(contexts),
            permits: Semaphore::new(size),
            size,
        }
    }

    fn idle(&self) -> MutexGuard<'_, Vec<Box<dyn BrowsingContext>>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Waits for a free context and leases it
    pub async fn acquire(&self) -> Result<ContextLease<'_>, BrowserError> {
        if self.size == 0 {
            return Err(BrowserError::PoolExhausted);
        }

        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| BrowserError::PoolExhausted)?;

        // A permit guarantees an idle context
        let context = self.idle().pop().ok_or(BrowserError::PoolExhausted)?;

        Ok(ContextLease {
            context: Some(context),
            pool: self,
            _permit: permit,
        })
    }

    /// Total number of contexts
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of contexts not currently leased
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl ContextLease<'_> {
    pub fn context(&self) -> &dyn BrowsingContext {
        // Only `drop` takes the context out
        self.context
            .as_deref()
            .expect("context lease used after release")
    }
}

impl Drop for ContextLease<'_> {
    fn drop(&mut self) {
        // Return the context before the permit is released
        if let Some(context) = self.context.take() {
            self.pool.idle().push(context);
        }
    }
}
