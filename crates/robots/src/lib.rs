use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use robotstxt::DefaultMatcher;
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;
use url::Url;

use webcrawler_core::CrawlError;

struct RobotsEntry {
    content: String,
    crawl_delay: Option<f64>,
}

/// Fetches and caches robots.txt per host, and answers allow/crawl-delay
/// queries against it. Each host gets a `OnceCell` slot: the first
/// lookup for a host performs the fetch and every concurrent lookup for
/// the same host awaits that same fetch instead of duplicating it, the
/// way the original handler's single `asyncio.Lock` serializes
/// first-time fills. Cache hits after population never block on it.
pub struct RobotsGate {
    user_agent: String,
    client: reqwest::Client,
    cache: Mutex<HashMap<String, Arc<OnceCell<Arc<RobotsEntry>>>>>,
    crawl_delay_re: Regex,
}

impl RobotsGate {
    pub fn new(user_agent: impl Into<String>, timeout: Duration) -> Result<Self, CrawlError> {
        let user_agent = user_agent.into();
        let client = reqwest::Client::builder()
            .user_agent(user_agent.clone())
            .timeout(timeout)
            .build()
            .map_err(|e| CrawlError::Config(e.to_string()))?;
        Ok(Self {
            user_agent,
            client,
            cache: Mutex::new(HashMap::new()),
            crawl_delay_re: Regex::new(r"(?i)crawl-delay\s*:\s*([0-9.]+)").unwrap(),
        })
    }

    fn host_key(url: &Url) -> String {
        match url.port() {
            Some(port) => format!("{}://{}:{}", url.scheme(), url.host_str().unwrap_or_default(), port),
            None => format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default()),
        }
    }

    async fn entry_for(&self, url: &Url) -> Arc<RobotsEntry> {
        let key = Self::host_key(url);
        let cell = {
            let mut cache = self.cache.lock().await;
            cache
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| async {
            let robots_url = format!("{key}/robots.txt");
            let content = match self.client.get(&robots_url).send().await {
                Ok(resp) if resp.status().is_success() => resp.text().await.unwrap_or_default(),
                Ok(_) => String::new(),
                Err(e) => {
                    debug!(host = %key, error = %e, "failed to fetch robots.txt, allowing by default");
                    String::new()
                }
            };

            let crawl_delay = self
                .crawl_delay_re
                .captures(&content)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<f64>().ok());

            Arc::new(RobotsEntry { content, crawl_delay })
        })
        .await
        .clone()
    }

    /// Returns true if `url` may be fetched. A host whose robots.txt is
    /// missing or unfetchable is treated as fully allowed.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        let entry = self.entry_for(url).await;
        if entry.content.is_empty() {
            return true;
        }
        DefaultMatcher::default().one_agent_allowed_by_robots(
            &entry.content,
            &self.user_agent,
            url.as_str(),
        )
    }

    /// Returns the `Crawl-delay` directive for the host, if any.
    pub async fn crawl_delay(&self, url: &Url) -> Option<f64> {
        self.entry_for(url).await.crawl_delay
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_key_preserves_non_default_port() {
        let url = Url::parse("http://127.0.0.1:8080/anything").unwrap();
        assert_eq!(RobotsGate::host_key(&url), "http://127.0.0.1:8080");
    }

    #[tokio::test]
    async fn missing_robots_allows_everything() {
        let gate = RobotsGate::new("TestBot/1.0", Duration::from_secs(1)).unwrap();
        let url = Url::parse("http://127.0.0.1:1/anything").unwrap();
        assert!(gate.is_allowed(&url).await);
    }

    #[test]
    fn crawl_delay_regex_extracts_value() {
        let re = Regex::new(r"(?i)crawl-delay\s*:\s*([0-9.]+)").unwrap();
        let text = "User-agent: *\nCrawl-delay: 2.5\nDisallow: /admin";
        let delay: f64 = re
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .unwrap();
        assert_eq!(delay, 2.5);
    }

    #[tokio::test]
    async fn concurrent_first_lookups_for_one_host_fetch_only_once() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        static HITS: AtomicUsize = AtomicUsize::new(0);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/robots.txt"))
            .respond_with(|_: &wiremock::Request| {
                HITS.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow:\n")
            })
            .mount(&server)
            .await;

        let gate = Arc::new(RobotsGate::new("TestBot/1.0", Duration::from_secs(2)).unwrap());
        let url = Url::parse(&format!("{}/page", server.uri())).unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let gate = gate.clone();
            let url = url.clone();
            handles.push(tokio::spawn(async move { gate.is_allowed(&url).await }));
        }
        for h in handles {
            assert!(h.await.unwrap());
        }

        assert_eq!(HITS.load(Ordering::SeqCst), 1);
    }
}
