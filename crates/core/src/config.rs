use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CrawlError;

/// Top-level crawler configuration, deserialized from TOML with an
/// embedded default as fallback (see the root binary's `main.rs`).
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub http: HttpConfig,
    pub retry: RetryConfig,
    pub rate: RateConfig,
    pub dynamic: DynamicConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Validate configuration values, ported from the original crawler's
    /// config module.
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.general.max_pages < 1 {
            return Err(CrawlError::Config("max_pages must be >= 1".into()));
        }
        if self.http.request_timeout_secs < 1 {
            return Err(CrawlError::Config("request_timeout must be >= 1".into()));
        }
        if self.rate.requests_per_second <= 0.0 {
            return Err(CrawlError::Config("requests_per_second must be > 0".into()));
        }
        if self.rate.per_domain_delay < 0.0 {
            return Err(CrawlError::Config("per_domain_delay must be >= 0".into()));
        }
        if self.general.num_workers < 1 {
            return Err(CrawlError::Config("num_workers must be >= 1".into()));
        }
        if !matches!(self.storage.backend, StorageBackend::Json) {
            return Err(CrawlError::Config(
                "storage_backend must be 'json' (only backend implemented)".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub max_depth: u32,
    pub max_pages: u64,
    pub same_domain_only: bool,
    pub allowed_domains: HashSet<String>,
    pub excluded_patterns: Vec<String>,
    pub num_workers: usize,
    pub respect_robots: bool,
    pub store_raw_html: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            same_domain_only: true,
            allowed_domains: HashSet::new(),
            excluded_patterns: default_excluded_patterns(),
            num_workers: 4,
            respect_robots: true,
            store_raw_html: false,
        }
    }
}

pub fn default_excluded_patterns() -> Vec<String> {
    vec![
        r".*\.(jpg|jpeg|png|gif|svg|ico|css|js|woff|woff2|ttf|eot)$".to_string(),
        r".*\.(pdf|doc|docx|xls|xlsx|ppt|pptx|zip|tar|gz)$".to_string(),
        r".*\.(mp3|mp4|avi|mov|wmv|flv)$".to_string(),
        r".*(login|logout|signup|register|auth).*".to_string(),
    ]
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_secs: u64,
    pub follow_redirects: bool,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "WebCrawler/1.0 (+https://example.invalid/crawler)".to_string(),
            request_timeout_secs: 30,
            follow_redirects: true,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_secs: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateConfig {
    pub requests_per_second: f64,
    pub per_domain_delay: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 2.0,
            per_domain_delay: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DynamicConfig {
    pub enable_dynamic: bool,
    pub dynamic_wait_time_secs: u64,
    pub dynamic_patterns: Vec<String>,
}

impl Default for DynamicConfig {
    fn default() -> Self {
        Self {
            enable_dynamic: false,
            dynamic_wait_time_secs: 5,
            dynamic_patterns: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Json,
}

impl Default for StorageBackend {
    fn default() -> Self {
        StorageBackend::Json
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            path: "./crawl_output".to_string(),
        }
    }
}
