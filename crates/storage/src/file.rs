use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use webcrawler_core::{CrawlError, CrawlResult};

use crate::Storage;

const RESULTS_FILE: &str = "crawl_results.json";

/// JSON-file-backed storage. Results are kept in memory and the whole
/// array is rewritten to disk on every save — the original JSON
/// storage's load/save-whole-file model, made upsert-by-URL so a retry
/// of the same page replaces its prior entry instead of duplicating it.
pub struct FileStorage {
    path: PathBuf,
    results: Mutex<Vec<CrawlResult>>,
}

impl FileStorage {
    /// Create (or open) storage rooted at `output_dir`, loading any
    /// previously persisted results.
    pub async fn new(output_dir: impl Into<PathBuf>) -> Result<Self, CrawlError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))?;

        let path = output_dir.join(RESULTS_FILE);
        let results = match fs::read_to_string(&path).await {
            Ok(text) if !text.is_empty() => {
                serde_json::from_str(&text).map_err(|e| CrawlError::Storage(e.to_string()))?
            }
            Ok(_) => Vec::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(CrawlError::Storage(e.to_string())),
        };

        debug!(path = %path.display(), loaded = results.len(), "opened file storage");
        Ok(Self {
            path,
            results: Mutex::new(results),
        })
    }

    async fn flush(&self, results: &[CrawlResult]) -> Result<(), CrawlError> {
        let json = serde_json::to_string_pretty(results).map_err(|e| CrawlError::Storage(e.to_string()))?;
        fs::write(&self.path, json)
            .await
            .map_err(|e| CrawlError::Storage(e.to_string()))
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn save(&self, result: &CrawlResult) -> Result<(), CrawlError> {
        let mut results = self.results.lock().await;
        match results.iter_mut().find(|r| r.url == result.url) {
            Some(existing) => *existing = result.clone(),
            None => results.push(result.clone()),
        }
        if let Err(e) = self.flush(&results).await {
            warn!(url = %result.url, error = %e, "failed to persist crawl result");
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self, url: &str) -> Result<Option<CrawlResult>, CrawlError> {
        Ok(self.results.lock().await.iter().find(|r| r.url == url).cloned())
    }

    async fn get_all(&self) -> Result<Vec<CrawlResult>, CrawlError> {
        Ok(self.results.lock().await.clone())
    }

    async fn count(&self) -> usize {
        self.results.lock().await.len()
    }

    async fn clear(&self) -> Result<(), CrawlError> {
        let mut results = self.results.lock().await;
        results.clear();
        self.flush(&results).await
    }
}
