//! Metadata index stored next to the uploaded files.
//!
//! Two JSON documents live in the blob store:
//!
//! - the short-link table at [`LINKS_PATH`], mapping short codes to files;
//! - the download-count table at [`STATS_PATH`], mapping file URLs to counts.
//!
//! Every mutation is a load/modify/conditional-write cycle (see
//! [`document::Document::update`]), so concurrent writers never silently
//! drop each other's changes on backends that support conditional writes.

pub mod code;
pub mod document;
pub mod downloads;
pub mod short_links;

use object_store::{BlobStore, BlobStoreError};
use serde::{Deserialize, Serialize};

pub use code::{CodeGenerator, CODE_ALPHABET, DEFAULT_CODE_LENGTH};
pub use downloads::{DownloadCountTable, DownloadCounts};
pub use short_links::{ShortLinkEntry, ShortLinkTable, ShortLinks};

/// Storage prefix of uploaded files.
pub const FILES_PREFIX: &str = "apk";
pub const LINKS_PATH: &str = "apk-meta/short-links.json";
pub const STATS_PATH: &str = "apk-stats/download-counts.json";

pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub code_length: usize,
    pub max_write_attempts: u32,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("storage error: {0}")]
    Storage(#[from] BlobStoreError),
    #[error("failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{pathname} kept changing, gave up after {attempts} attempts")]
    TooManyConflicts { pathname: String, attempts: u32 },
    #[error("no free short code of length {length}")]
    CodeSpaceExhausted { length: usize },
}

/// Both metadata tables over one blob store.
#[derive(Debug, Clone)]
pub struct MetadataIndex {
    short_links: ShortLinkTable,
    downloads: DownloadCountTable,
}

impl MetadataIndex {
    pub fn new(store: BlobStore, config: &IndexConfig) -> Self {
        Self {
            short_links: ShortLinkTable::new(store.clone(), config),
            downloads: DownloadCountTable::new(store, config),
        }
    }

    pub fn short_links(&self) -> &ShortLinkTable {
        &self.short_links
    }

    pub fn downloads(&self) -> &DownloadCountTable {
        &self.downloads
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_tables_are_independent() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        let index = MetadataIndex::new(store.clone(), &IndexConfig::default());

        let code = index.short_links().create("u", "a.apk").await.unwrap();
        index.downloads().increment("u").await.unwrap();

        assert!(store.read_document(LINKS_PATH).await.unwrap().is_some());
        assert!(store.read_document(STATS_PATH).await.unwrap().is_some());
        assert!(index.short_links().resolve(&code).await.is_some());
        // Metadata never shows up as an uploaded file.
        assert!(store.list(FILES_PREFIX).await.unwrap().is_empty());
    }

    #[test]
    fn test_config_defaults_from_partial_toml_like_json() {
        let config: IndexConfig = serde_json::from_str(r#"{"code_length": 6}"#).unwrap();
        assert_eq!(config.code_length, 6);
        assert_eq!(config.max_write_attempts, DEFAULT_MAX_WRITE_ATTEMPTS);
    }
}
