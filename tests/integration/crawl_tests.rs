//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full crawl
//! cycle end-to-end. A second mock server stands in for an external host: its
//! port differs, so its host key differs from the target's.

use flate2::write::GzEncoder;
use flate2::Compression;
use linkprobe::config::{Config, ExtractorKind};
use linkprobe::crawler::Coordinator;
use linkprobe::output::{Completion, CrawlReport, EventCategory, MemorySink};
use linkprobe::state::{CrawlPhase, Partition};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration pointing at the given mock server
fn create_test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.crawler.target_host = server.uri();
    config.crawler.workers = 4;
    config.crawler.timeout_secs = 5;
    config.crawler.retry_backoff_ms = 0;
    config.user_agent.value = "linkprobe-test/1.0".to_string();
    config
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .mount(server)
        .await;
}

async fn crawl(config: &Config) -> (CrawlReport, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let coordinator = Coordinator::new(config, sink.clone()).expect("coordinator");
    let report = coordinator.run().await;
    (report, sink)
}

#[tokio::test]
async fn test_full_crawl_classifies_links() {
    let site = MockServer::start().await;
    let external = MockServer::start().await;
    let base = site.uri();
    let ext = external.uri();

    mount_page(
        &site,
        "/",
        &format!(
            r#"<html><body>
            <a href="/about">About</a>
            <a href="{ext}/ext">Elsewhere</a>
            </body></html>"#
        ),
    )
    .await;
    mount_page(
        &site,
        "/about",
        r#"<a href="/">Home</a><a href="/about">Self</a><a href="/about#team">Team</a>"#,
    )
    .await;

    // Out-site pages are checked but never scanned
    mount_page(&external, "/ext", r#"<a href="/never">Never</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/never"))
        .respond_with(html("unreachable"))
        .expect(0)
        .mount(&external)
        .await;

    let (report, sink) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.completion, Completion::Completed);
    assert_eq!(report.insite_links, 2);
    assert_eq!(report.outsite_links, 1);
    assert_eq!(report.responses, 3);
    assert_eq!(report.pages_scanned, 2);
    assert_eq!(report.checked_insite, 2);
    assert_eq!(report.checked_outsite, 1);
    assert_eq!(report.dead_links(), 0);

    let discoveries = sink.by_category(EventCategory::Discovery);
    let mut found: Vec<_> = discoveries.iter().map(|e| e.url.clone()).collect();
    found.sort();
    let mut expected = vec![format!("{base}/about"), format!("{ext}/ext")];
    expected.sort();
    assert_eq!(found, expected);
    assert!(discoveries
        .iter()
        .all(|e| e.detail == format!("found on {base}/")));

    // Every checked URL is reported exactly once
    for url in [format!("{base}/"), format!("{base}/about"), format!("{ext}/ext")] {
        let infos: Vec<_> = sink
            .for_url(&url)
            .into_iter()
            .filter(|e| e.category == EventCategory::Info)
            .collect();
        assert_eq!(infos.len(), 1, "info events for {url}");
        assert!(infos[0].detail.starts_with("200"));
    }
    assert!(sink.by_category(EventCategory::Error).is_empty());
}

#[tokio::test]
async fn test_registry_partitions_are_exclusive() {
    let site = MockServer::start().await;
    let external = MockServer::start().await;
    let base = site.uri();
    let ext = external.uri();

    mount_page(
        &site,
        "/",
        &format!(r#"<a href="/a">a</a><a href="{ext}/x">x</a><a href="{base}/a">a again</a>"#),
    )
    .await;
    mount_page(&site, "/a", &format!(r#"<a href="{ext}/x">x again</a>"#)).await;
    mount_page(&external, "/x", "<p>external</p>").await;

    let sink = Arc::new(MemorySink::new());
    let coordinator = Coordinator::new(&create_test_config(&site), sink).unwrap();
    coordinator.run().await;

    let registry = coordinator.registry();
    assert_eq!(coordinator.phase(), CrawlPhase::Done);
    assert!(registry.contains(Partition::InSite, &format!("{base}/a")));
    assert!(!registry.contains(Partition::OutSite, &format!("{base}/a")));
    assert!(registry.contains(Partition::OutSite, &format!("{ext}/x")));
    assert!(!registry.contains(Partition::InSite, &format!("{ext}/x")));
    assert_eq!(registry.len(Partition::InSite), 2);
    assert_eq!(registry.len(Partition::OutSite), 1);
}

#[tokio::test]
async fn test_non_markup_body_not_scanned() {
    let site = MockServer::start().await;

    mount_page(&site, "/", r#"<a href="/data.json">data</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/data.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(r#"{"html": "<a href=\"/hidden\">x</a>"}"#, "application/json"),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/hidden"))
        .respond_with(html("hidden"))
        .expect(0)
        .mount(&site)
        .await;

    let (report, _) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.insite_links, 2);
    assert_eq!(report.responses, 2);
    assert_eq!(report.pages_scanned, 1);
}

#[tokio::test]
async fn test_unsupported_and_hostless_links_ignored() {
    let site = MockServer::start().await;

    mount_page(
        &site,
        "/",
        r##"<a href="javascript:void(0)">js</a>
            <a href="mailto:webmaster@example.test">mail</a>
            <a href="#top">top</a>
            <a href="/real">real</a>"##,
    )
    .await;
    mount_page(&site, "/real", "<p>real</p>").await;

    let (report, sink) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.insite_links, 2);
    assert_eq!(report.outsite_links, 0);
    assert_eq!(sink.by_category(EventCategory::Discovery).len(), 1);
}

#[tokio::test]
async fn test_gzip_page_links_found() {
    let site = MockServer::start().await;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(br#"<html><body><a href="/zipped">z</a></body></html>"#)
        .unwrap();
    let body = encoder.finish().unwrap();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(body, "text/html")
                .insert_header("content-encoding", "gzip"),
        )
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/zipped"))
        .respond_with(html("<p>unzipped</p>"))
        .expect(1)
        .mount(&site)
        .await;

    let (report, _) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.insite_links, 2);
    assert_eq!(report.pages_scanned, 2);
}

#[tokio::test]
async fn test_offhost_redirect_logged_not_scanned() {
    let site = MockServer::start().await;
    let external = MockServer::start().await;
    let base = site.uri();
    let ext = external.uri();

    mount_page(&site, "/", r#"<a href="/go">go</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/go"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", format!("{ext}/landing").as_str()),
        )
        .mount(&site)
        .await;
    mount_page(&external, "/landing", r#"<a href="/deep">deep</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/deep"))
        .respond_with(html("deep"))
        .expect(0)
        .mount(&external)
        .await;

    let (report, sink) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.insite_links, 2);
    assert_eq!(report.outsite_links, 0);
    assert_eq!(report.pages_scanned, 1);
    // A redirected in-site URL is still classified by the URL that was requested
    assert_eq!(report.checked_insite, 2);

    let events = sink.for_url(&format!("{base}/go"));
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].category, EventCategory::Info);
    assert!(events[0].detail.contains(&format!("redirected to {ext}/landing")));
}

#[tokio::test]
async fn test_redirect_onto_site_is_scanned() {
    let site = MockServer::start().await;
    let external = MockServer::start().await;
    let base = site.uri();
    let ext = external.uri();

    mount_page(&site, "/", &format!(r#"<a href="{ext}/bounce">bounce</a>"#)).await;
    Mock::given(method("GET"))
        .and(path("/bounce"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{base}/docs/landing").as_str()),
        )
        .mount(&external)
        .await;
    mount_page(
        &site,
        "/docs/landing",
        r#"<a href="deep">deep</a><a href="/top">top</a>"#,
    )
    .await;
    mount_page(&site, "/docs/deep", "<p>deep</p>").await;
    mount_page(&site, "/top", "<p>top</p>").await;

    let sink = Arc::new(MemorySink::new());
    let coordinator = Coordinator::new(&create_test_config(&site), sink.clone()).unwrap();
    let report = coordinator.run().await;

    assert_eq!(report.completion, Completion::Completed);
    assert_eq!(report.insite_links, 3);
    assert_eq!(report.outsite_links, 1);
    assert_eq!(report.pages_scanned, 4);
    // The bounce URL is classified by its own host
    assert_eq!(report.checked_outsite, 1);

    // Links on the landing page resolve against the final URL, not the bounce URL
    let registry = coordinator.registry();
    assert!(registry.contains(Partition::InSite, &format!("{base}/docs/deep")));
    assert!(registry.contains(Partition::InSite, &format!("{base}/top")));
    assert!(registry.contains(Partition::OutSite, &format!("{ext}/bounce")));
    assert!(!registry.contains(Partition::OutSite, &format!("{ext}/docs/deep")));

    let bounce = format!("{ext}/bounce");
    let from_bounce: Vec<_> = sink
        .by_category(EventCategory::Discovery)
        .into_iter()
        .filter(|e| e.detail == format!("found on {bounce}"))
        .map(|e| e.url)
        .collect();
    assert_eq!(from_bounce.len(), 2);
    assert!(from_bounce.contains(&format!("{base}/docs/deep")));
    assert!(from_bounce.contains(&format!("{base}/top")));
}

#[tokio::test]
async fn test_error_status_logged_as_info() {
    let site = MockServer::start().await;
    let base = site.uri();

    // Unmatched requests get wiremock's default 404
    mount_page(&site, "/", r#"<a href="/missing">gone</a>"#).await;

    let (report, sink) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.error_responses, 1);
    assert_eq!(report.dead_links(), 1);
    assert!(sink.by_category(EventCategory::Error).is_empty());

    let events = sink.for_url(&format!("{base}/missing"));
    let info = events
        .iter()
        .find(|e| e.category == EventCategory::Info)
        .expect("info event for 404");
    assert_eq!(info.detail, "404 Not Found");
}

#[tokio::test]
async fn test_connection_refused_logged_as_error() {
    let site = MockServer::start().await;

    mount_page(&site, "/", r#"<a href="http://127.0.0.1:1/dead">dead</a>"#).await;

    let (report, sink) = crawl(&create_test_config(&site)).await;

    assert_eq!(report.completion, Completion::Completed);
    assert_eq!(report.outsite_links, 1);
    assert_eq!(report.client_errors, 1);
    assert_eq!(report.errored, 1);

    let errors = sink.by_category(EventCategory::Error);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].url, "http://127.0.0.1:1/dead");
}

#[tokio::test]
async fn test_timeout_retried_then_succeeds() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount_page(&site, "/", r#"<a href="/slow">slow</a>"#).await;
    // First attempt stalls past the timeout, the second answers at once
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .mount(&site)
        .await;
    mount_page(&site, "/slow", "<p>slow</p>").await;

    let mut config = create_test_config(&site);
    config.crawler.timeout_secs = 1;

    let (report, sink) = crawl(&config).await;
    let slow = format!("{base}/slow");

    assert_eq!(report.completion, Completion::Completed);
    assert_eq!(report.timeouts, 1);
    assert_eq!(report.retries, 1);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.insite_links, 2);

    let events = sink.for_url(&slow);
    let retries: Vec<_> = events
        .iter()
        .filter(|e| e.category == EventCategory::Retry)
        .collect();
    assert_eq!(retries.len(), 1);
    assert!(retries[0].detail.ends_with("retry later"));
    assert!(events.iter().any(|e| e.category == EventCategory::Info));
    assert!(sink.by_category(EventCategory::Error).is_empty());
}

#[tokio::test]
async fn test_retry_ceiling_gives_up() {
    let site = MockServer::start().await;
    let base = site.uri();

    mount_page(&site, "/", r#"<a href="/stuck">stuck</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/stuck"))
        .respond_with(html("<p>never in time</p>").set_delay(Duration::from_secs(3)))
        .mount(&site)
        .await;

    let mut config = create_test_config(&site);
    config.crawler.timeout_secs = 1;
    config.crawler.max_retries = 1;

    let (report, sink) = crawl(&config).await;
    let stuck = format!("{base}/stuck");

    assert_eq!(report.completion, Completion::Completed);
    assert_eq!(report.timeouts, 2);
    assert_eq!(report.retries, 1);
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.errored, 1);

    let events = sink.for_url(&stuck);
    assert_eq!(
        events
            .iter()
            .filter(|e| e.category == EventCategory::Retry)
            .count(),
        1
    );
    let error = events
        .iter()
        .find(|e| e.category == EventCategory::Error)
        .expect("give-up error");
    assert!(error.detail.contains("giving up after 2 attempts"));
}

#[tokio::test]
async fn test_full_queue_drops_links() {
    let site = MockServer::start().await;

    mount_page(
        &site,
        "/",
        r#"<a href="/a">a</a><a href="/b">b</a><a href="/c">c</a>"#,
    )
    .await;
    mount_page(&site, "/a", "<p>a</p>").await;

    let mut config = create_test_config(&site);
    config.crawler.workers = 1;
    config.crawler.max_queue_depth = Some(1);

    let (report, sink) = crawl(&config).await;

    assert_eq!(report.completion, Completion::Completed);
    assert_eq!(report.dropped, 2);
    assert_eq!(report.responses, 2);

    let errors = sink.by_category(EventCategory::Error);
    assert_eq!(errors.len(), 2);
    assert!(errors
        .iter()
        .all(|e| e.detail == "queue full, link not checked"));
}

#[tokio::test]
async fn test_html_extractor_decodes_entities() {
    let site = MockServer::start().await;

    mount_page(&site, "/", r#"<a href="/q?a=1&amp;b=2">q</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/q"))
        .and(query_param("a", "1"))
        .and(query_param("b", "2"))
        .respond_with(html("<p>q</p>"))
        .expect(1)
        .mount(&site)
        .await;

    let mut config = create_test_config(&site);
    config.crawler.link_extractor = ExtractorKind::Html;

    let (report, _) = crawl(&config).await;

    assert_eq!(report.insite_links, 2);
    assert_eq!(report.error_responses, 0);
}

#[tokio::test]
async fn test_deadline_stops_crawl() {
    let site = MockServer::start().await;

    mount_page(&site, "/", r#"<a href="/slow">slow</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(10)))
        .mount(&site)
        .await;

    let mut config = create_test_config(&site);
    config.crawler.timeout_secs = 30;
    config.crawler.deadline_secs = Some(1);

    let started = std::time::Instant::now();
    let (report, _) = crawl(&config).await;

    assert_eq!(report.completion, Completion::DeadlineExceeded);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_external_cancel_stops_crawl() {
    let site = MockServer::start().await;

    mount_page(&site, "/", r#"<a href="/slow">slow</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<p>slow</p>").set_delay(Duration::from_secs(10)))
        .mount(&site)
        .await;

    let mut config = create_test_config(&site);
    config.crawler.timeout_secs = 30;

    let sink = Arc::new(MemorySink::new());
    let coordinator = Coordinator::new(&config, sink).unwrap();
    let shutdown = coordinator.shutdown_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        shutdown.cancel();
    });

    let report = coordinator.run().await;

    assert_eq!(report.completion, Completion::Cancelled);
    assert_ne!(coordinator.phase(), CrawlPhase::Done);
    assert_eq!(report.responses, 1);
}
