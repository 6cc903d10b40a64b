//! Configuration module for Site-Sentinel
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The resulting [`Config`] is passed explicitly to the crawler; nothing reads
//! configuration from global state.
//!
//! # Example
//!
//! ```no_run
//! use site_sentinel::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("site-sentinel.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{BrowserConfig, Config, CrawlerConfig, OutputConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
