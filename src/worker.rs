use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, warn};
use url::Url;

use webcrawler_core::config::AppConfig;
use webcrawler_core::{CrawlResult, CrawlStatus, Request, Statistics};
use webcrawler_fetcher::{DynamicDispatch, Fetcher};
use webcrawler_frontier::Frontier;
use webcrawler_parser::LinkExtractor;
use webcrawler_ratelimiter::RateLimiter;
use webcrawler_robots::RobotsGate;
use webcrawler_storage::Storage;

/// Callback invoked after each page completes successfully. Errors are
/// swallowed the way the original worker's `on_page_crawled` hook does.
pub type PageCallback = dyn Fn(&CrawlResult) + Send + Sync;

/// One crawl worker: pulls requests off a shared frontier, applies the
/// robots/rate-limit gates, fetches, parses, and re-queues discovered
/// links. Grounded in `CrawlWorker._process_url`'s twelve-step
/// algorithm; several workers run this loop concurrently over the same
/// [`Frontier`].
pub struct Worker {
    pub id: usize,
    pub config: Arc<AppConfig>,
    pub frontier: Arc<Frontier>,
    pub storage: Arc<dyn Storage>,
    pub rate_limiter: Arc<RateLimiter>,
    pub robots_gate: Arc<RobotsGate>,
    pub link_extractor: Arc<LinkExtractor>,
    pub static_fetcher: Arc<dyn Fetcher>,
    pub dynamic_fetcher: Arc<dyn Fetcher>,
    pub dynamic_dispatch: Arc<DynamicDispatch>,
    pub stats: Arc<Statistics>,
    pub on_page_crawled: Option<Arc<PageCallback>>,
}

impl Worker {
    /// Main worker loop: stops once `max_pages` have been crawled or the
    /// frontier has been empty across two consecutive checks.
    pub async fn run(&self) {
        loop {
            if self.stats.pages_crawled.load(std::sync::atomic::Ordering::Relaxed) >= self.config.general.max_pages {
                break;
            }

            let request = match self.frontier.get().await {
                Some(request) => request,
                None => {
                    tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                    match self.frontier.get().await {
                        Some(request) => request,
                        None => break,
                    }
                }
            };

            if let Err(e) = self.process(request).await {
                error!(worker = self.id, error = %e, "worker error processing request");
                self.stats.pages_failed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            }
        }
    }

    async fn process(&self, request: Request) -> anyhow::Result<()> {
        let url = Url::parse(&request.url)?;
        let domain = url.host_str().unwrap_or_default().to_string();

        if self.config.general.respect_robots {
            if !self.robots_gate.is_allowed(&url).await {
                debug!(url = %request.url, "disallowed by robots.txt");
                self.stats.pages_skipped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                self.frontier.mark_visited(&request.url).await;
                return Ok(());
            }
            if let Some(delay) = self.robots_gate.crawl_delay(&url).await {
                self.rate_limiter.set_domain_delay(&domain, delay);
            }
        }

        self.rate_limiter.acquire(&domain).await;
        self.frontier.mark_visited(&request.url).await;

        let started = Instant::now();
        let mut result = if self.dynamic_dispatch.should_use_dynamic(&request.url) {
            self.dynamic_fetcher.fetch(&request).await
        } else {
            self.static_fetcher.fetch(&request).await
        };

        if matches!(result.status, CrawlStatus::Failed | CrawlStatus::Skipped) {
            match result.status {
                CrawlStatus::Failed => {
                    self.stats.pages_failed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                _ => {
                    self.stats.pages_skipped.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
            self.storage.save(&result).await?;
            return Ok(());
        }

        let parsed = webcrawler_parser::parse(&result.html, &request.url);
        result.title = parsed.title;
        result.text = parsed.text;
        result.metadata = parsed.metadata;

        let links = self.link_extractor.extract_links(&result.html, &url);
        result.links = links.clone();

        if !self.config.general.store_raw_html {
            result.html.clear();
        }
        result.elapsed_time = started.elapsed().as_secs_f64();

        self.storage.save(&result).await?;

        self.stats.pages_crawled.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        self.stats
            .bytes_downloaded
            .fetch_add(result.text.len() as u64, std::sync::atomic::Ordering::Relaxed);
        self.stats.record_domain(&domain);

        if let Some(callback) = &self.on_page_crawled {
            callback(&result);
        }

        if request.depth < request.max_depth {
            for link in &links {
                let child = request.child(link.clone());
                if self.frontier.add(child).await {
                    self.stats.urls_found.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
            }
        }

        Ok(())
    }
}
