use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{info, warn};
use url::Url;

use webcrawler_core::config::AppConfig;
use webcrawler_core::{Request, Statistics, StatisticsSnapshot};
use webcrawler_fetcher::{DynamicDispatch, DynamicFetcher, Fetcher, StaticFetcher};
use webcrawler_frontier::Frontier;
use webcrawler_parser::LinkExtractor;
use webcrawler_ratelimiter::RateLimiter;
use webcrawler_robots::RobotsGate;
use webcrawler_storage::{FileStorage, Storage};

use crate::worker::{PageCallback, Worker};

/// Wires every component together and drives a flat pool of workers
/// over one shared frontier. Grounded in the teacher's `run_crawl`
/// shape (broadcast shutdown, `tokio::spawn` per worker, `Arc`-shared
/// state, `ctrl_c`-triggered graceful teardown) and in
/// `WebCrawler(config, on_page_crawled=...).crawl([url]) -> stats` for
/// the public API it exposes.
pub struct Orchestrator {
    config: Arc<AppConfig>,
}

impl Orchestrator {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Crawl starting from `seeds`, returning final statistics once the
    /// frontier drains, `max_pages` is reached, or Ctrl-C is received.
    pub async fn run(
        &self,
        seeds: Vec<String>,
        on_page_crawled: Option<Arc<PageCallback>>,
    ) -> Result<StatisticsSnapshot> {
        self.config.validate()?;
        if seeds.is_empty() {
            anyhow::bail!("empty seed list");
        }
        let config = self.config.clone();

        // If same-host mode is on and no allow-list is configured,
        // infer the allow-list from the seed hosts so a multi-seed
        // crawl across different seed hosts doesn't drop cross-seed
        // links.
        let mut allowed_domains = config.general.allowed_domains.clone();
        if config.general.same_domain_only && allowed_domains.is_empty() {
            allowed_domains = seeds
                .iter()
                .filter_map(|s| Url::parse(s).ok())
                .filter_map(|u| u.host_str().map(str::to_string))
                .collect();
        }
        let link_extractor = Arc::new(LinkExtractor::new(
            allowed_domains,
            config.general.same_domain_only,
            &config.general.excluded_patterns,
        ));

        let frontier = Arc::new(Frontier::new());
        for seed in &seeds {
            match Url::parse(seed) {
                Ok(url) => {
                    let normalized = link_extractor.normalize_url(&url).to_string();
                    frontier.add(Request::seed(normalized, config.general.max_depth)).await;
                }
                Err(e) => {
                    warn!(seed = %seed, error = %e, "skipping malformed seed URL");
                }
            }
        }

        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.storage.path.clone()).await?);
        let rate_limiter = Arc::new(RateLimiter::new(
            config.rate.requests_per_second,
            config.rate.per_domain_delay,
        ));
        let robots_gate = Arc::new(RobotsGate::new(
            config.http.user_agent.clone(),
            Duration::from_secs(config.http.request_timeout_secs),
        )?);
        let static_fetcher = Arc::new(StaticFetcher::new(
            &config.http.user_agent,
            Duration::from_secs(config.http.request_timeout_secs),
            config.http.follow_redirects,
            config.http.max_redirects,
            config.retry.max_retries,
            config.retry.retry_delay_secs,
        )?);
        let dynamic_fetcher = Arc::new(DynamicFetcher::new(config.dynamic.dynamic_wait_time_secs));
        let dynamic_dispatch = Arc::new(DynamicDispatch::new(
            config.dynamic.enable_dynamic,
            &config.dynamic.dynamic_patterns,
        ));

        let stats = Arc::new(Statistics::new());
        stats.mark_started();

        let (shutdown_tx, _) = broadcast::channel::<()>(1);

        {
            let shutdown_tx = shutdown_tx.clone();
            tokio::spawn(async move {
                if signal::ctrl_c().await.is_ok() {
                    info!("shutdown signal received");
                    let _ = shutdown_tx.send(());
                }
            });
        }

        let mut handles = Vec::with_capacity(config.general.num_workers);
        for id in 0..config.general.num_workers {
            let worker = Worker {
                id,
                config: config.clone(),
                frontier: frontier.clone(),
                storage: storage.clone(),
                rate_limiter: rate_limiter.clone(),
                robots_gate: robots_gate.clone(),
                link_extractor: link_extractor.clone(),
                static_fetcher: static_fetcher.clone(),
                dynamic_fetcher: dynamic_fetcher.clone(),
                dynamic_dispatch: dynamic_dispatch.clone(),
                stats: stats.clone(),
                on_page_crawled: on_page_crawled.clone(),
            };
            let mut shutdown = shutdown_tx.subscribe();

            let handle = tokio::spawn(async move {
                tokio::select! {
                    _ = shutdown.recv() => {
                        warn!(worker = id, "worker stopped early by shutdown signal");
                    }
                    _ = worker.run() => {}
                }
            });
            handles.push(handle);
        }

        for handle in handles {
            let _ = handle.await;
        }

        stats.mark_finished();
        info!(
            pages_crawled = stats.pages_crawled.load(std::sync::atomic::Ordering::Relaxed),
            "crawl finished"
        );

        // Tear down every component; a failure closing one must not
        // mask a failure closing another, so each is swallowed and
        // logged independently.
        if let Err(e) = static_fetcher.close().await {
            warn!(error = %e, "error closing static fetcher");
        }
        if let Err(e) = dynamic_fetcher.close().await {
            warn!(error = %e, "error closing dynamic fetcher");
        }
        if let Err(e) = storage.close().await {
            warn!(error = %e, "error closing storage");
        }
        frontier.close().await;

        Ok(stats.snapshot())
    }
}
