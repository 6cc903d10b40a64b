//! Integration tests for the crawler
//!
//! These tests drive the full crawl cycle (navigation, screenshots, link
//! discovery, batching, logs and the summary) through a scripted browser.

use crate::support::{create_test_config, page, FakeBrowser, FakePage, LateEvent};
use site_sentinel::browser::ConsoleLevel;
use site_sentinel::config::Config;
use site_sentinel::crawler::Crawler;
use site_sentinel::CrawlReport;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

async fn run(config: Config, browser: &FakeBrowser) -> CrawlReport {
    let crawler = Crawler::new(config, browser)
        .await
        .expect("Failed to set up crawler");
    crawler.run().await
}

fn read_log(dir: &Path, name: &str) -> Option<String> {
    std::fs::read_to_string(dir.join("logs").join(name)).ok()
}

fn screenshot_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.join("screenshots"))
        .expect("Screenshot directory missing")
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test(start_paused = true)]
async fn test_failing_seed_ends_the_crawl() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![(
        page("/"),
        FakePage::with_status(500).links(&["/a", "/b"]),
    )]);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 2, 3), &browser).await;

    assert_eq!(report.visited_count, 1);
    assert_eq!(report.failed_count, 1);
    assert_eq!(report.success_rate, 0.0);
    assert_eq!(report.failed_urls, vec![page("/")]);

    // Children of a failed page are never discovered
    assert_eq!(observations.navigated_urls(), vec![page("/")]);

    let crawl_log = read_log(dir.path(), "crawl-errors.txt").expect("crawl log missing");
    let lines: Vec<_> = crawl_log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" - https://example.com/ : HTTP 500"));

    // No screenshot for a page that failed to load
    assert!(screenshot_names(dir.path()).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_children_crawled_in_batches() {
    let dir = tempdir().unwrap();
    let children = ["/a", "/b", "/c", "/d", "/e"];
    let mut pages = vec![(page("/"), FakePage::ok().links(&children))];
    for child in children {
        pages.push((page(child), FakePage::ok().links(&["/deep"])));
    }
    pages.push((page("/deep"), FakePage::ok()));
    let browser = FakeBrowser::new(pages);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 1, 3), &browser).await;

    assert_eq!(report.visited_count, 6);
    assert_eq!(report.failed_count, 0);
    assert_eq!(report.success_rate, 100.0);

    // Depth 2 is beyond the limit
    assert_eq!(observations.navigation_count(&page("/deep")), 0);
    assert_eq!(observations.peak_concurrency(), 3);

    let records = observations.navigations();
    assert_eq!(records.len(), 6);
    assert_eq!(records[0].url, page("/"));

    let first: HashSet<_> = records[1..4].iter().map(|r| r.url.clone()).collect();
    let second: HashSet<_> = records[4..].iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        first,
        HashSet::from([page("/a"), page("/b"), page("/c")])
    );
    assert_eq!(second, HashSet::from([page("/d"), page("/e")]));

    // The second batch starts only after the first has fully settled
    let first_batch_done = records[1..4]
        .iter()
        .map(|r| r.finished.expect("first batch did not finish"))
        .max()
        .unwrap();
    for record in &records[4..] {
        assert!(record.started >= first_batch_done);
    }
}

#[tokio::test(start_paused = true)]
async fn test_console_and_subresource_errors_are_logged() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![(
        page("/"),
        FakePage::ok()
            .console(ConsoleLevel::Error, "Uncaught TypeError: x is undefined")
            .console(ConsoleLevel::Warning, "deprecated API")
            .console(ConsoleLevel::Log, "hello")
            .sub_resource("https://example.com/app.js", 200)
            .sub_resource("https://example.com/missing.png", 404),
    )]);

    let report = run(create_test_config(dir.path(), 1, 3), &browser).await;

    // Page-level problems do not fail the page
    assert_eq!(report.visited_count, 1);
    assert_eq!(report.failed_count, 0);

    let console_log = read_log(dir.path(), "console-errors.txt").expect("console log missing");
    let lines: Vec<_> = console_log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" - https://example.com/ : Uncaught TypeError: x is undefined"));

    let http_log = read_log(dir.path(), "http-errors.txt").expect("http log missing");
    let lines: Vec<_> = http_log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].contains(" - https://example.com/missing.png : HTTP 404"));

    assert!(read_log(dir.path(), "crawl-errors.txt").is_none());
}

#[tokio::test(start_paused = true)]
async fn test_cyclic_links_navigate_each_url_once() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![
        (page("/"), FakePage::ok().links(&["/a", "/b", "/#top"])),
        (page("/a"), FakePage::ok().links(&["/", "/b", "b"])),
        (page("/b"), FakePage::ok().links(&["/a", "https://example.com/", "/c"])),
        (page("/c"), FakePage::ok().links(&["/a", "/b", "/c#section"])),
    ]);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 5, 3), &browser).await;

    assert_eq!(report.visited_count, 4);
    for path in ["/", "/a", "/b", "/c"] {
        assert_eq!(observations.navigation_count(&page(path)), 1, "{}", path);
    }
    assert_eq!(observations.navigations().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_max_depth_zero_only_visits_seed() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![
        (page("/"), FakePage::ok().links(&["/a"])),
        (page("/a"), FakePage::ok()),
    ]);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 0, 3), &browser).await;

    assert_eq!(report.visited_count, 1);
    assert_eq!(observations.navigated_urls(), vec![page("/")]);
}

#[tokio::test(start_paused = true)]
async fn test_external_and_unreadable_links_are_skipped() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![
        (
            page("/"),
            FakePage::ok()
                .links(&[
                    "https://other.example.org/",
                    "http://example.com/insecure",
                    "mailto:team@example.com",
                    "javascript:void(0)",
                    "/a",
                ])
                .unreadable_anchor(),
        ),
        (page("/a"), FakePage::ok()),
    ]);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 2, 3), &browser).await;

    assert_eq!(report.visited_count, 2);
    assert_eq!(observations.navigated_urls(), vec![page("/"), page("/a")]);
}

#[tokio::test(start_paused = true)]
async fn test_navigation_timeout_fails_only_that_branch() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![
        (page("/"), FakePage::ok().links(&["/slow", "/fast"])),
        (page("/slow"), FakePage::hanging()),
        (page("/fast"), FakePage::ok()),
    ]);

    let report = run(create_test_config(dir.path(), 1, 3), &browser).await;

    assert_eq!(report.visited_count, 3);
    assert_eq!(report.failed_urls, vec![page("/slow")]);

    let crawl_log = read_log(dir.path(), "crawl-errors.txt").expect("crawl log missing");
    assert_eq!(crawl_log.lines().count(), 1);
    assert!(crawl_log
        .trim_end()
        .ends_with(" - https://example.com/slow : Navigation timed out after 1000ms"));
}

#[tokio::test(start_paused = true)]
async fn test_missing_response_is_http_unknown() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![
        (page("/"), FakePage::ok().links(&["/empty"])),
        (page("/empty"), FakePage::no_response()),
    ]);

    let report = run(create_test_config(dir.path(), 1, 3), &browser).await;

    assert_eq!(report.failed_urls, vec![page("/empty")]);
    let crawl_log = read_log(dir.path(), "crawl-errors.txt").expect("crawl log missing");
    assert!(crawl_log
        .trim_end()
        .ends_with(" - https://example.com/empty : HTTP unknown"));
}

#[tokio::test(start_paused = true)]
async fn test_each_context_serves_one_branch_at_a_time() {
    let dir = tempdir().unwrap();
    let children: Vec<String> = (0..7).map(|i| format!("/p{}", i)).collect();
    let child_refs: Vec<&str> = children.iter().map(String::as_str).collect();

    let mut pages = vec![(page("/"), FakePage::ok().links(&child_refs))];
    for child in &children {
        pages.push((page(child), FakePage::ok().links(&["/shared"])));
    }
    pages.push((page("/shared"), FakePage::ok()));
    let browser = FakeBrowser::new(pages);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 3, 2), &browser).await;

    assert_eq!(report.visited_count, 9);
    assert_eq!(observations.contexts_opened(), 2);
    assert!(!observations.overlapping_context_use());
    assert!(observations.peak_concurrency() <= 2);

    let contexts: HashSet<_> = observations
        .navigations()
        .iter()
        .map(|r| r.context)
        .collect();
    assert_eq!(contexts.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_summary_and_screenshots_written() {
    let dir = tempdir().unwrap();
    let browser = FakeBrowser::new(vec![
        (page("/"), FakePage::ok().links(&["/about", "/broken"])),
        (page("/about"), FakePage::ok()),
        (page("/broken"), FakePage::with_status(404)),
    ]);

    let config = create_test_config(dir.path(), 1, 3);
    let crawler = Crawler::new(config, &browser)
        .await
        .unwrap()
        .with_config_hash("abc123");
    let report = crawler.run().await;

    assert_eq!(report.visited_count, 3);
    assert_eq!(report.failed_count, 1);
    assert!((report.success_rate - 66.666).abs() < 0.01);

    let summary = read_log(dir.path(), "crawl-summary.txt").expect("summary missing");
    assert!(summary.starts_with("Crawl completed at: "));
    assert!(summary.contains("Total Pages Visited: 3\n"));
    assert!(summary.contains("Total Pages Failed: 1\n"));
    assert!(summary.contains("Success Rate: 66.7%\n"));
    assert!(summary.contains("Config Hash: abc123\n"));
    assert!(summary.contains("\nFailed URLs:\nhttps://example.com/broken\n"));

    let names = screenshot_names(dir.path());
    assert_eq!(names.len(), 2);
    assert!(names.iter().all(|name| name.ends_with(".png")));
    assert!(names.iter().any(|name| name.starts_with("example.com__")));
    assert!(names.iter().any(|name| name.starts_with("example.com_about_")));
}

#[tokio::test(start_paused = true)]
async fn test_late_events_are_attributed_to_current_page() {
    let dir = tempdir().unwrap();
    // One context: "/" finishes at 100ms, "/a" is loading from 100ms to 200ms
    let browser = FakeBrowser::new(vec![
        (
            page("/"),
            FakePage::ok()
                .links(&["/a"])
                .late(
                    Duration::from_millis(50),
                    LateEvent::ConsoleError("late script error".to_string()),
                )
                .late(
                    Duration::from_millis(60),
                    LateEvent::Response {
                        url: page("/beacon"),
                        status: 503,
                    },
                ),
        ),
        (page("/a"), FakePage::ok()),
    ]);
    let observations = browser.observations();

    let report = run(create_test_config(dir.path(), 1, 1), &browser).await;

    assert_eq!(observations.contexts_opened(), 1);
    assert_eq!(report.visited_count, 2);
    assert_eq!(report.failed_count, 0);
    assert!(read_log(dir.path(), "crawl-errors.txt").is_none());

    let console_log = read_log(dir.path(), "console-errors.txt").expect("console log missing");
    let lines: Vec<_> = console_log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(" - https://example.com/a : late script error"));

    let http_log = read_log(dir.path(), "http-errors.txt").expect("http log missing");
    let lines: Vec<_> = http_log.lines().collect();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(
        " - https://example.com/beacon : HTTP 503 (requested by https://example.com/a)"
    ));
}
