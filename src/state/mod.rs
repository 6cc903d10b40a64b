//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DedupStore`: which URLs have been attempted and which of those failed
//! - `CrawlTarget`: a URL waiting to be crawled at a given depth
//! - `PageOutcome`: the result of attempting one target

mod dedup_store;
mod page_outcome;

// Re-export main types
pub use dedup_store::{DedupSnapshot, DedupStore};
pub use page_outcome::{CrawlTarget, PageOutcome};
