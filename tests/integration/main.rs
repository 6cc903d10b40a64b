//! End-to-end crawl tests against a scripted in-memory browser

mod crawl_tests;
mod support;
