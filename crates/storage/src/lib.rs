mod file;

pub use file::FileStorage;

use async_trait::async_trait;

use webcrawler_core::{CrawlError, CrawlResult};

/// Pluggable persistence for crawl results. The crawler only ever talks
/// to this trait — `FileStorage` is the one concrete implementation
/// required for testability; a document-database backend is a drop-in
/// implementor of the same trait.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn save(&self, result: &CrawlResult) -> Result<(), CrawlError>;
    async fn get(&self, url: &str) -> Result<Option<CrawlResult>, CrawlError>;
    async fn get_all(&self) -> Result<Vec<CrawlResult>, CrawlError>;
    async fn count(&self) -> usize;
    async fn clear(&self) -> Result<(), CrawlError>;

    /// Flushes and releases resources. `FileStorage` has already
    /// flushed on every `save`, so this is a no-op for it.
    async fn close(&self) -> Result<(), CrawlError> {
        Ok(())
    }
}
