use async_trait::async_trait;
use regex::Regex;

use webcrawler_core::{CrawlResult, Request};

use crate::Fetcher;

/// Headless-browser fetcher. Only the dispatch surface (pattern
/// matching against `dynamic_patterns`) is implemented; a real
/// rendering backend is out of scope, so every fetch terminates with a
/// not-configured error rather than a panic or a silent fallback.
pub struct DynamicFetcher {
    wait_time_secs: u64,
}

impl DynamicFetcher {
    pub fn new(wait_time_secs: u64) -> Self {
        Self { wait_time_secs }
    }

    pub fn wait_time_secs(&self) -> u64 {
        self.wait_time_secs
    }
}

#[async_trait]
impl Fetcher for DynamicFetcher {
    async fn fetch(&self, request: &Request) -> CrawlResult {
        CrawlResult::failed(
            request.url.clone(),
            request.depth,
            request.parent_url.clone(),
            "dynamic rendering backend not configured".to_string(),
        )
    }
}

/// Matches the original worker's `_should_use_dynamic`: dynamic
/// rendering only kicks in when enabled and the URL matches one of the
/// configured patterns.
pub struct DynamicDispatch {
    enabled: bool,
    patterns: Vec<Regex>,
}

impl DynamicDispatch {
    pub fn new(enabled: bool, patterns: &[String]) -> Self {
        let patterns = patterns
            .iter()
            .filter_map(|p| {
                regex::RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .ok()
            })
            .collect();
        Self { enabled, patterns }
    }

    pub fn should_use_dynamic(&self, url: &str) -> bool {
        self.enabled && self.patterns.iter().any(|re| re.is_match(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn dynamic_fetch_reports_not_configured() {
        let fetcher = DynamicFetcher::new(5);
        let req = Request::seed("https://example.com/app", 2);
        let result = fetcher.fetch(&req).await;
        assert_eq!(result.status, webcrawler_core::CrawlStatus::Failed);
        assert!(result.error.unwrap().contains("not configured"));
    }

    #[test]
    fn dispatch_respects_enabled_flag() {
        let dispatch = DynamicDispatch::new(false, &["spa".to_string()]);
        assert!(!dispatch.should_use_dynamic("https://example.com/spa"));
    }

    #[test]
    fn dispatch_matches_pattern_case_insensitively() {
        let dispatch = DynamicDispatch::new(true, &["/SPA/".to_string()]);
        assert!(dispatch.should_use_dynamic("https://example.com/spa/app"));
    }
}
