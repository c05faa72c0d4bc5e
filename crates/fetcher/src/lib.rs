mod dynamic;
mod r#static;

pub use dynamic::DynamicFetcher;
pub use r#static::StaticFetcher;

use async_trait::async_trait;
use webcrawler_core::{CrawlError, CrawlResult, Request};

/// Fetches a single request to a terminal [`CrawlResult`]. Implementors
/// own their own retry/backoff policy internally — callers always get
/// back a terminal status (`Completed`, `Failed`, or `Skipped`), never
/// a transport error.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &Request) -> CrawlResult;

    /// Release any held resources. Implementations backed by a plain
    /// `reqwest::Client` have nothing to release and keep the default.
    async fn close(&self) -> Result<(), CrawlError> {
        Ok(())
    }
}
