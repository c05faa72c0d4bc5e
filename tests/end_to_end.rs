//! End-to-end scenarios driving a `Worker` directly over a `wiremock`
//! server, standing in for the "stub fetcher returning deterministic
//! HTML keyed by URL" the scenarios call for.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use webcrawler::orchestrator::Orchestrator;
use webcrawler::worker::Worker;
use webcrawler_core::config::AppConfig;
use webcrawler_core::{Request, Statistics};
use webcrawler_fetcher::{DynamicDispatch, DynamicFetcher, Fetcher, StaticFetcher};
use webcrawler_frontier::Frontier;
use webcrawler_parser::LinkExtractor;
use webcrawler_ratelimiter::RateLimiter;
use webcrawler_robots::RobotsGate;
use webcrawler_storage::{FileStorage, Storage};

async fn new_worker(config: AppConfig, timeout: Duration) -> (Worker, tempfile::TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(dir.path()).await.unwrap());
    let config = Arc::new(config);
    let static_fetcher: Arc<dyn Fetcher> = Arc::new(
        StaticFetcher::new(
            &config.http.user_agent,
            timeout,
            config.http.follow_redirects,
            config.http.max_redirects,
            config.retry.max_retries,
            config.retry.retry_delay_secs,
        )
        .unwrap(),
    );
    let worker = Worker {
        id: 0,
        frontier: Arc::new(Frontier::new()),
        storage,
        rate_limiter: Arc::new(RateLimiter::new(50.0, 0.0)),
        robots_gate: Arc::new(RobotsGate::new(config.http.user_agent.clone(), timeout).unwrap()),
        link_extractor: Arc::new(LinkExtractor::new(
            config.general.allowed_domains.clone(),
            config.general.same_domain_only,
            &config.general.excluded_patterns,
        )),
        static_fetcher,
        dynamic_fetcher: Arc::new(DynamicFetcher::new(0)),
        dynamic_dispatch: Arc::new(DynamicDispatch::new(false, &[])),
        stats: Arc::new(Statistics::new()),
        on_page_crawled: None,
        config,
    };
    (worker, dir)
}

#[tokio::test]
async fn single_page_no_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>T</title></html>"),
        )
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.max_depth = 0;
    config.general.respect_robots = false;
    let (worker, _dir) = new_worker(config, Duration::from_secs(2)).await;

    worker.frontier.add(Request::seed(server.uri(), 0)).await;
    worker.run().await;

    assert_eq!(worker.stats.pages_crawled.load(Ordering::Relaxed), 1);
    assert_eq!(worker.stats.pages_failed.load(Ordering::Relaxed), 0);
    assert_eq!(worker.stats.pages_skipped.load(Ordering::Relaxed), 0);

    let saved = worker.storage.get_all().await.unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "T");
    assert!(saved[0].links.is_empty());
    assert_eq!(worker.stats.snapshot().domains_crawled.len(), 1);
}

#[tokio::test]
async fn two_level_bfs_reaches_all_three_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html").set_body_string(
                r#"<html><title>A</title><body><a href="/b">b</a><a href="/c">c</a></body></html>"#,
            ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>B</title></html>"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/c"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>C</title></html>"),
        )
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.max_depth = 1;
    config.general.max_pages = 10;
    config.general.respect_robots = false;
    let (worker, _dir) = new_worker(config, Duration::from_secs(2)).await;

    worker
        .frontier
        .add(Request::seed(format!("{}/a", server.uri()), 1))
        .await;
    worker.run().await;

    assert_eq!(worker.stats.pages_crawled.load(Ordering::Relaxed), 3);
    assert!(worker.stats.urls_found.load(Ordering::Relaxed) >= 3);
}

#[tokio::test]
async fn external_links_are_never_enqueued() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html").set_body_string(
                r#"<html><title>A</title><body><a href="/b">b</a><a href="http://other.invalid/x">other</a></body></html>"#,
            ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>B</title></html>"),
        )
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.max_depth = 1;
    config.general.same_domain_only = true;
    config.general.respect_robots = false;
    let (worker, _dir) = new_worker(config, Duration::from_secs(2)).await;

    worker
        .frontier
        .add(Request::seed(format!("{}/a", server.uri()), 1))
        .await;
    worker.run().await;

    assert_eq!(worker.stats.pages_crawled.load(Ordering::Relaxed), 2);
    let saved = worker.storage.get_all().await.unwrap();
    assert!(saved.iter().all(|r| !r.url.contains("other.invalid")));
}

#[tokio::test]
async fn retry_then_success_on_transport_timeout() {
    let server = MockServer::start().await;
    // First two requests hang past the client timeout (a transport
    // error); the third responds immediately with HTML.
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>A</title></html>")
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>A</title></html>"),
        )
        .with_priority(2)
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.max_depth = 0;
    config.general.respect_robots = false;
    config.retry.max_retries = 3;
    config.retry.retry_delay_secs = 0.01;
    let (worker, _dir) = new_worker(config, Duration::from_millis(50)).await;

    worker
        .frontier
        .add(Request::seed(format!("{}/a", server.uri()), 0))
        .await;

    let start = std::time::Instant::now();
    worker.run().await;
    let elapsed = start.elapsed();

    assert_eq!(worker.stats.pages_crawled.load(Ordering::Relaxed), 1);
    assert!(elapsed >= Duration::from_millis(30));
}

#[tokio::test]
async fn non_html_content_type_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/doc"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/pdf").set_body_bytes(b"%PDF".to_vec()))
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.respect_robots = false;
    let (worker, _dir) = new_worker(config, Duration::from_secs(2)).await;

    worker
        .frontier
        .add(Request::seed(format!("{}/doc", server.uri()), 0))
        .await;
    worker.run().await;

    assert_eq!(worker.stats.pages_skipped.load(Ordering::Relaxed), 1);
    let saved = worker.storage.get_all().await.unwrap();
    assert_eq!(saved[0].title, "");
}

#[tokio::test]
async fn robots_denial_skips_and_marks_visited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /private\n"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/public"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>Public</title></html>"),
        )
        .mount(&server)
        .await;

    let mut config = AppConfig::default();
    config.general.respect_robots = true;
    let (worker, _dir) = new_worker(config, Duration::from_secs(2)).await;

    worker
        .frontier
        .add(Request::seed(format!("{}/public", server.uri()), 0))
        .await;
    worker
        .frontier
        .add(Request::seed(format!("{}/private", server.uri()), 0))
        .await;
    worker.run().await;

    assert_eq!(worker.stats.pages_crawled.load(Ordering::Relaxed), 1);
    assert_eq!(worker.stats.pages_skipped.load(Ordering::Relaxed), 1);
    assert!(worker.frontier.is_visited(&format!("{}/private", server.uri())).await);

    let saved = worker.storage.get_all().await.unwrap();
    assert!(saved.iter().any(|r| r.title == "Public"));
}

#[tokio::test]
async fn differently_cased_seed_urls_normalize_to_the_same_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>A</title></html>"),
        )
        .mount(&server)
        .await;

    let storage_dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.general.max_depth = 0;
    config.general.respect_robots = false;
    config.general.num_workers = 1;
    config.storage.path = storage_dir.path().to_string_lossy().to_string();

    let base = server.uri();
    let upper = base.replace("http://", "HTTP://");
    let seeds = vec![format!("{upper}/a/"), format!("{base}/a")];

    let orchestrator = Orchestrator::new(config);
    let stats = orchestrator.run(seeds, None).await.unwrap();

    assert_eq!(stats.pages_crawled, 1);
}

#[tokio::test]
async fn same_host_allow_list_is_inferred_from_seeds_when_unconfigured() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "text/html").set_body_string(
                r#"<html><title>A</title><body><a href="/b">b</a></body></html>"#,
            ),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html><title>B</title></html>"),
        )
        .mount(&server)
        .await;

    let storage_dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.general.max_depth = 1;
    config.general.respect_robots = false;
    config.general.num_workers = 1;
    assert!(config.general.allowed_domains.is_empty());
    assert!(config.general.same_domain_only);
    config.storage.path = storage_dir.path().to_string_lossy().to_string();

    let orchestrator = Orchestrator::new(config);
    let stats = orchestrator.run(vec![format!("{}/a", server.uri())], None).await.unwrap();

    assert_eq!(stats.pages_crawled, 2);
}
