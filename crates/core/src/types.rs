use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashSet;
use serde::{Deserialize, Serialize};

/// How a request should be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderHint {
    Static,
    Dynamic,
}

impl Default for RenderHint {
    fn default() -> Self {
        RenderHint::Static
    }
}

/// A pending unit of work. Identity for dedup purposes is `url` alone —
/// priority and depth never factor into equality.
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub depth: u32,
    pub max_depth: u32,
    pub parent_url: Option<String>,
    pub priority: i64,
    pub render_hint: RenderHint,
}

impl Request {
    pub fn seed(url: impl Into<String>, max_depth: u32) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            max_depth,
            parent_url: None,
            priority: 0,
            render_hint: RenderHint::Static,
        }
    }

    /// Build the child request one hop deeper, inheriting `max_depth`.
    /// Priority favors shallower work so breadth drains before depth.
    pub fn child(&self, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: self.depth + 1,
            max_depth: self.max_depth,
            parent_url: Some(self.url.clone()),
            priority: self.max_depth as i64 - self.depth as i64 - 1,
            render_hint: RenderHint::Static,
        }
    }
}

/// Terminal outcome of processing one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    Skipped,
}

/// The outcome of processing one request, as persisted by storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResult {
    pub url: String,
    pub status_code: u16,
    pub content_type: Option<String>,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub crawled_at: DateTime<Utc>,
    pub depth: u32,
    pub parent_url: Option<String>,
    pub elapsed_time: f64,
    pub status: CrawlStatus,
    pub error: Option<String>,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

impl CrawlResult {
    pub fn failed(url: impl Into<String>, depth: u32, parent_url: Option<String>, error: String) -> Self {
        Self {
            url: url.into(),
            status_code: 0,
            content_type: None,
            html: String::new(),
            text: String::new(),
            title: String::new(),
            links: Vec::new(),
            metadata: HashMap::new(),
            crawled_at: Utc::now(),
            depth,
            parent_url,
            elapsed_time: 0.0,
            status: CrawlStatus::Failed,
            error: Some(error),
            headers: HashMap::new(),
        }
    }

    pub fn skipped(url: impl Into<String>, depth: u32, parent_url: Option<String>, reason: String) -> Self {
        Self {
            status: CrawlStatus::Skipped,
            error: Some(reason),
            ..Self::failed(url, depth, parent_url, String::new())
        }
    }
}

/// Process-wide counters updated by workers. Each field tolerates
/// concurrent increments without an external lock.
#[derive(Debug, Default)]
pub struct Statistics {
    pub urls_found: AtomicU64,
    pub pages_crawled: AtomicU64,
    pub pages_failed: AtomicU64,
    pub pages_skipped: AtomicU64,
    pub bytes_downloaded: AtomicU64,
    domains_crawled: DashSet<String>,
    start_time: std::sync::Mutex<Option<DateTime<Utc>>>,
    end_time: std::sync::Mutex<Option<DateTime<Utc>>>,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_started(&self) {
        *self.start_time.lock().unwrap() = Some(Utc::now());
    }

    pub fn mark_finished(&self) {
        *self.end_time.lock().unwrap() = Some(Utc::now());
    }

    pub fn record_domain(&self, domain: &str) {
        self.domains_crawled.insert(domain.to_string());
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        let start = *self.start_time.lock().unwrap();
        let end = *self.end_time.lock().unwrap();
        let duration_seconds = match (start, end) {
            (Some(s), Some(e)) => (e - s).num_milliseconds() as f64 / 1000.0,
            _ => 0.0,
        };
        let pages_crawled = self.pages_crawled.load(Ordering::Relaxed);
        let pages_per_second = if duration_seconds > 0.0 {
            pages_crawled as f64 / duration_seconds
        } else {
            0.0
        };

        StatisticsSnapshot {
            urls_found: self.urls_found.load(Ordering::Relaxed),
            pages_crawled,
            pages_failed: self.pages_failed.load(Ordering::Relaxed),
            pages_skipped: self.pages_skipped.load(Ordering::Relaxed),
            bytes_downloaded: self.bytes_downloaded.load(Ordering::Relaxed),
            domains_crawled: self.domains_crawled.iter().map(|d| d.clone()).collect(),
            start_time: start,
            end_time: end,
            duration_seconds,
            pages_per_second,
        }
    }
}

/// Immutable, serializable view of [`Statistics`] at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub urls_found: u64,
    pub pages_crawled: u64,
    pub pages_failed: u64,
    pub pages_skipped: u64,
    pub bytes_downloaded: u64,
    pub domains_crawled: Vec<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub pages_per_second: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn child_priority_favors_shallower_depth() {
        let seed = Request::seed("https://example.com", 3);
        let child = seed.child("https://example.com/a");
        assert_eq!(child.depth, 1);
        assert_eq!(child.priority, 1); // max_depth(3) - depth(0) - 1
        assert_eq!(child.parent_url.as_deref(), Some("https://example.com"));
    }

    #[test]
    fn statistics_snapshot_computes_rate() {
        let stats = Statistics::new();
        stats.mark_started();
        stats.pages_crawled.fetch_add(10, Ordering::Relaxed);
        stats.record_domain("example.com");
        stats.mark_finished();

        let snap = stats.snapshot();
        assert_eq!(snap.pages_crawled, 10);
        assert_eq!(snap.domains_crawled, vec!["example.com".to_string()]);
        assert!(snap.duration_seconds >= 0.0);
    }
}
