//! Crawl report generation
//!
//! The report is computed once, after the whole traversal has settled, from
//! the final contents of the dedup store.

use crate::state::DedupSnapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// File name of the summary inside the log directory
pub const SUMMARY_FILE_NAME: &str = "crawl-summary.txt";

/// Final result of one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub completed_at: DateTime<Utc>,
    pub visited_count: usize,
    pub failed_count: usize,
    /// Percentage of visited pages that did not fail, 0 when nothing was visited
    pub success_rate: f64,
    /// Every attempted URL, in the order it was claimed
    pub visited_urls: Vec<String>,
    /// Every failed URL, in the order it failed
    pub failed_urls: Vec<String>,
    pub duration: Duration,
    /// SHA-256 of the configuration file, when known
    pub config_hash: Option<String>,
}

impl CrawlReport {
    /// Builds the report from the final dedup state
    pub fn from_snapshot(snapshot: DedupSnapshot, duration: Duration) -> Self {
        let visited_count = snapshot.visited.len();
        let failed_count = snapshot.failed.len();
        Self {
            completed_at: Utc::now(),
            visited_count,
            failed_count,
            success_rate: success_rate(visited_count, failed_count),
            visited_urls: snapshot.visited,
            failed_urls: snapshot.failed,
            duration,
            config_hash: None,
        }
    }

    pub fn with_config_hash(mut self, hash: impl Into<String>) -> Self {
        self.config_hash = Some(hash.into());
        self
    }

    /// Number of visited pages that did not fail
    pub fn succeeded_count(&self) -> usize {
        self.visited_count.saturating_sub(self.failed_count)
    }
}

/// Computes `(visited - failed) / visited * 100`, guarding against zero visits
pub fn success_rate(visited: usize, failed: usize) -> f64 {
    if visited == 0 {
        return 0.0;
    }
    visited.saturating_sub(failed) as f64 / visited as f64 * 100.0
}

/// Formats the report as the plain-text summary file
pub fn format_summary(report: &CrawlReport) -> String {
    let mut text = String::new();

    text.push_str(&format!(
        "Crawl completed at: {}\n",
        report
            .completed_at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    text.push_str(&format!("Total Pages Visited: {}\n", report.visited_count));
    text.push_str(&format!("Total Pages Failed: {}\n", report.failed_count));
    text.push_str(&format!("Success Rate: {:.1}%\n", report.success_rate));
    text.push_str(&format!(
        "Duration: {:.1}s\n",
        report.duration.as_secs_f64()
    ));
    if let Some(hash) = &report.config_hash {
        text.push_str(&format!("Config Hash: {}\n", hash));
    }

    text.push_str("\nVisited URLs:\n");
    for url in &report.visited_urls {
        text.push_str(url);
        text.push('\n');
    }

    if !report.failed_urls.is_empty() {
        text.push_str("\nFailed URLs:\n");
        for url in &report.failed_urls {
            text.push_str(url);
            text.push('\n');
        }
    }

    text
}

/// Writes the summary into `log_dir`, replacing any previous one
pub fn write_summary(report: &CrawlReport, log_dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(log_dir)?;
    let mut file = File::create(log_dir.join(SUMMARY_FILE_NAME))?;
    file.write_all(format_summary(report).as_bytes())?;
    Ok(())
}

/// Prints the summary to stdout
pub fn print_summary(report: &CrawlReport) {
    println!("=== Crawl Summary ===");
    println!("Total Pages Visited: {}", report.visited_count);
    println!("Total Pages Failed: {}", report.failed_count);
    println!("Success Rate: {:.1}%", report.success_rate);

    if !report.failed_urls.is_empty() {
        println!("\nFailed URLs ({}):", report.failed_urls.len());
        for url in &report.failed_urls {
            println!("  - {}", url);
        }
    }
}
