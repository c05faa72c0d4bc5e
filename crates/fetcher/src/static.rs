use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use webcrawler_core::{CrawlResult, CrawlStatus, Request};

use crate::Fetcher;

/// Plain HTTP(S) fetcher with exponential-backoff retries. Grounded in
/// the original crawler's static fetcher: same retry count, same
/// `retry_delay * 2^attempt` backoff, same text/html content-type gate.
pub struct StaticFetcher {
    client: reqwest::Client,
    max_retries: u32,
    retry_delay_secs: f64,
}

impl StaticFetcher {
    pub fn new(
        user_agent: &str,
        request_timeout: Duration,
        follow_redirects: bool,
        max_redirects: u8,
        max_retries: u32,
        retry_delay_secs: f64,
    ) -> Result<Self, reqwest::Error> {
        let redirect_policy = if follow_redirects {
            reqwest::redirect::Policy::limited(max_redirects as usize)
        } else {
            reqwest::redirect::Policy::none()
        };

        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(request_timeout)
            .redirect(redirect_policy)
            .build()?;

        Ok(Self {
            client,
            max_retries,
            retry_delay_secs,
        })
    }

    async fn do_fetch(&self, request: &Request) -> Result<CrawlResult, String> {
        let start = Instant::now();
        let resp = self
            .client
            .get(&request.url)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let final_url = resp.url().to_string();
        let status_code = resp.status().as_u16();
        let mut headers = HashMap::new();
        for (k, v) in resp.headers() {
            if let Ok(val) = v.to_str() {
                headers.insert(k.as_str().to_string(), val.to_string());
            }
        }
        let content_type = headers.get("content-type").cloned();

        let is_text = content_type
            .as_deref()
            .map(|ct| ct.contains("text/html") || ct.contains("text/plain"))
            .unwrap_or(false);

        if !is_text {
            return Ok(CrawlResult {
                url: final_url,
                status_code,
                content_type: content_type.clone(),
                html: String::new(),
                text: String::new(),
                title: String::new(),
                links: Vec::new(),
                metadata: HashMap::new(),
                crawled_at: chrono::Utc::now(),
                depth: request.depth,
                parent_url: request.parent_url.clone(),
                elapsed_time: start.elapsed().as_secs_f64(),
                status: CrawlStatus::Skipped,
                error: Some(format!(
                    "non-HTML content: {}",
                    content_type.unwrap_or_default()
                )),
                headers,
            });
        }

        let html = resp.text().await.map_err(|e| e.to_string())?;

        Ok(CrawlResult {
            url: final_url,
            status_code,
            content_type,
            html,
            text: String::new(),
            title: String::new(),
            links: Vec::new(),
            metadata: HashMap::new(),
            crawled_at: chrono::Utc::now(),
            depth: request.depth,
            parent_url: request.parent_url.clone(),
            elapsed_time: start.elapsed().as_secs_f64(),
            status: CrawlStatus::Completed,
            error: None,
            headers,
        })
    }
}

#[async_trait]
impl Fetcher for StaticFetcher {
    async fn fetch(&self, request: &Request) -> CrawlResult {
        let mut last_error = String::new();

        for attempt in 0..=self.max_retries {
            match self.do_fetch(request).await {
                Ok(result) => return result,
                Err(e) => {
                    warn!(url = %request.url, attempt, error = %e, "fetch attempt failed");
                    last_error = e;
                }
            }

            if attempt < self.max_retries {
                let delay = self.retry_delay_secs * 2f64.powi(attempt as i32);
                debug!(url = %request.url, delay_secs = delay, "retrying after backoff");
                sleep(Duration::from_secs_f64(delay)).await;
            }
        }

        CrawlResult::failed(
            request.url.clone(),
            request.depth,
            request.parent_url.clone(),
            last_error,
        )
    }
}
