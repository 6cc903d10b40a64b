//! Failure classification and append-only error logs
//!
//! Three independent sources feed the logs: console messages, network
//! responses and navigation failures. Records are handed to a single
//! writer task over an unbounded channel, so producers never wait on disk
//! and never see an IO error; the writer reports problems through
//! `tracing` and keeps going.

use crate::browser::{ConsoleLevel, ConsoleMessage, PageEventHandler, ResponseEvent};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};

/// Log category, one file each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Error-level console output from a page
    Console,
    /// Failing response for a document or any sub-resource
    Http,
    /// A page that could not be crawled
    Navigation,
}

impl ErrorCategory {
    pub fn log_file_name(&self) -> &'static str {
        match self {
            Self::Console => "console-errors.txt",
            Self::Http => "http-errors.txt",
            Self::Navigation => "crawl-errors.txt",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Console => "console",
            Self::Http => "http",
            Self::Navigation => "navigation",
        };
        f.write_str(name)
    }
}

/// One line in one of the error logs
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub category: ErrorCategory,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(category: ErrorCategory, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            url: url.into(),
            category,
            message: message.into(),
        }
    }

    /// Formats as `<timestamp> - <url> : <message>` with a trailing newline
    pub fn to_log_line(&self) -> String {
        format!(
            "{} - {} : {}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.url,
            self.message
        )
    }
}

/// Returns true for statuses outside the 2xx/3xx range
pub fn is_error_status(status: u16) -> bool {
    !(200..400).contains(&status)
}

/// Turns an error-level console message into a record for the page that emitted it
pub fn classify_console(message: &ConsoleMessage) -> Option<ErrorRecord> {
    if message.level != ConsoleLevel::Error {
        return None;
    }
    Some(ErrorRecord::new(
        ErrorCategory::Console,
        message.page_url.clone(),
        message.text.clone(),
    ))
}

/// Turns a failing response into a record for the requested resource
pub fn classify_response(response: &ResponseEvent) -> Option<ErrorRecord> {
    if !is_error_status(response.status) {
        return None;
    }
    let message = if response.url == response.page_url {
        format!("HTTP {}", response.status)
    } else {
        format!("HTTP {} (requested by {})", response.status, response.page_url)
    };
    Some(ErrorRecord::new(
        ErrorCategory::Http,
        response.url.clone(),
        message,
    ))
}

enum LogCommand {
    Append(ErrorRecord),
    Flush(oneshot::Sender<()>),
}

/// Handle to the error log writer task
///
/// Cloning is cheap; all clones feed the same writer.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    tx: mpsc::UnboundedSender<LogCommand>,
}

impl fmt::Debug for LogCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Append(record) => f.debug_tuple("Append").field(record).finish(),
            Self::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl ErrorLog {
    /// Starts the writer task; log files are created under `log_dir` on first use
    pub fn spawn(log_dir: impl Into<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(log_dir.into(), rx));
        Self { tx }
    }

    /// Queues a record; never blocks and never fails the caller
    pub fn append(&self, record: ErrorRecord) {
        if let Err(e) = self.tx.send(LogCommand::Append(record)) {
            tracing::warn!("Error log writer is gone, dropping record: {:?}", e.0);
        }
    }

    /// Waits until every record queued before this call has been written
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(LogCommand::Flush(done_tx)).is_err() {
            return;
        }
        let _ = done_rx.await;
    }
}

async fn run_writer(log_dir: PathBuf, mut rx: mpsc::UnboundedReceiver<LogCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            LogCommand::Append(record) => {
                if let Err(e) = append_line(&log_dir, &record).await {
                    tracing::warn!(
                        "Failed to write {} error for {} to {}: {}",
                        record.category,
                        record.url,
                        log_dir.display(),
                        e
                    );
                }
            }
            LogCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("Error log writer stopped");
}

async fn append_line(log_dir: &Path, record: &ErrorRecord) -> std::io::Result<()> {
    tokio::fs::create_dir_all(log_dir).await?;
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join(record.category.log_file_name()))
        .await?;
    file.write_all(record.to_log_line().as_bytes()).await?;
    file.flush().await
}

/// Classifies page events and crawl failures into the error logs
#[derive(Debug, Clone)]
pub struct FailureRecorder {
    log: ErrorLog,
}

impl FailureRecorder {
    pub fn new(log: ErrorLog) -> Self {
        Self { log }
    }

    /// Records a branch that could not be crawled
    pub fn navigation_failure(&self, url: &str, reason: &str) {
        self.log
            .append(ErrorRecord::new(ErrorCategory::Navigation, url, reason));
    }

    /// Waits for everything recorded so far to reach disk
    pub async fn flush(&self) {
        self.log.flush().await;
    }
}

impl PageEventHandler for FailureRecorder {
    fn on_console_message(&self, message: ConsoleMessage) {
        if let Some(record) = classify_console(&message) {
            tracing::debug!("Console error on {}: {}", record.url, record.message);
            self.log.append(record);
        }
    }

    fn on_response(&self, response: ResponseEvent) {
        if let Some(record) = classify_response(&response) {
            tracing::debug!("HTTP error {}: {}", record.url, record.message);
            self.log.append(record);
        }
    }
}
