use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::sleep;
use tracing::debug;

/// Per-host rate limiter. A global semaphore bounds total in-flight
/// requests; a per-host lock enforces spacing between requests to the
/// same host. Mirrors the original rate limiter's token-bucket-by-host
/// design.
pub struct RateLimiter {
    per_domain_delay: f64,
    global: Semaphore,
    domain_locks: DashMap<String, Arc<Mutex<()>>>,
    domain_last_request: DashMap<String, Instant>,
    domain_delays: DashMap<String, f64>,
}

impl RateLimiter {
    pub fn new(requests_per_second: f64, per_domain_delay: f64) -> Self {
        let permits = ((requests_per_second * 2.0) as usize).max(1);
        Self {
            per_domain_delay,
            global: Semaphore::new(permits),
            domain_locks: DashMap::new(),
            domain_last_request: DashMap::new(),
            domain_delays: DashMap::new(),
        }
    }

    /// Override the delay for one host, e.g. from a robots.txt
    /// `Crawl-delay` directive.
    pub fn set_domain_delay(&self, domain: &str, delay: f64) {
        self.domain_delays.insert(domain.to_string(), delay);
    }

    pub fn delay_for_domain(&self, domain: &str) -> f64 {
        self.domain_delays
            .get(domain)
            .map(|d| *d)
            .unwrap_or(self.per_domain_delay)
    }

    /// Block until it is safe to issue a request to `domain`.
    pub async fn acquire(&self, domain: &str) {
        let _permit = self
            .global
            .acquire()
            .await
            .expect("rate limiter semaphore never closes");

        let lock = self
            .domain_locks
            .entry(domain.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let delay = self.delay_for_domain(domain);
        let now = Instant::now();
        let wait = match self.domain_last_request.get(domain) {
            Some(last) => {
                let elapsed = now.duration_since(*last).as_secs_f64();
                delay - elapsed
            }
            None => 0.0,
        };

        if wait > 0.0 {
            debug!(domain, wait_secs = wait, "pacing request");
            sleep(Duration::from_secs_f64(wait)).await;
        }

        self.domain_last_request.insert(domain.to_string(), Instant::now());
    }

    /// Clear all tracked state. Intended for test setup/teardown.
    pub fn reset(&self) {
        self.domain_last_request.clear();
        self.domain_delays.clear();
        self.domain_locks.clear();
    }
}
