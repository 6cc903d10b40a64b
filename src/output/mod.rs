//! Output module for crawl results
//!
//! This module handles:
//! - Classifying console, HTTP and navigation failures into append-only logs
//! - Naming per-page screenshots
//! - Building, writing and printing the final crawl report

pub mod errors;
pub mod screenshot;
pub mod summary;

pub use errors::{
    classify_console, classify_response, ErrorCategory, ErrorLog, ErrorRecord, FailureRecorder,
};
pub use screenshot::{sanitize_url, ScreenshotNamer};
pub use summary::{
    format_summary, print_summary, success_rate, write_summary, CrawlReport, SUMMARY_FILE_NAME,
};
