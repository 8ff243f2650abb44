//! Download-count table: `url -> count`.

use std::collections::BTreeMap;

use object_store::BlobStore;
use tracing::debug;

use super::document::{Document, Mutation};
use super::{IndexConfig, IndexError, STATS_PATH};

pub type DownloadCounts = BTreeMap<String, u64>;

#[derive(Debug, Clone)]
pub struct DownloadCountTable {
    document: Document<u64>,
}

impl DownloadCountTable {
    pub fn new(store: BlobStore, config: &IndexConfig) -> Self {
        Self {
            document: Document::new(store, STATS_PATH, config.max_write_attempts),
        }
    }

    pub async fn load(&self) -> DownloadCounts {
        self.document.load().await
    }

    /// Like [`Self::load`], but storage errors are returned instead of
    /// reading as an empty table.
    pub async fn try_load(&self) -> Result<DownloadCounts, IndexError> {
        Ok(self.document.load_versioned().await?.0)
    }

    pub async fn save(&self, counts: &DownloadCounts) -> Result<(), IndexError> {
        self.document.save(counts).await
    }

    /// Add one download for `url` and return the new count.
    pub async fn increment(&self, url: &str) -> Result<u64, IndexError> {
        let count = self
            .document
            .update(|counts| {
                let count = counts.entry(url.to_string()).or_insert(0);
                *count += 1;
                Ok(Mutation::Changed(*count))
            })
            .await?;
        debug!(url = %url, count, "download recorded");
        Ok(count)
    }

    pub async fn get_all(&self) -> DownloadCounts {
        self.load().await
    }

    /// Drop the counter for `url`. Returns whether it existed.
    pub async fn remove(&self, url: &str) -> Result<bool, IndexError> {
        self.remove_many(&[url.to_string()]).await.map(|n| n > 0)
    }

    pub async fn remove_many(&self, urls: &[String]) -> Result<usize, IndexError> {
        self.document
            .update(|counts| {
                let removed = urls
                    .iter()
                    .filter(|url| counts.remove(url.as_str()).is_some())
                    .count();
                Ok(if removed > 0 {
                    Mutation::Changed(removed)
                } else {
                    Mutation::Unchanged(0)
                })
            })
            .await
    }
}
