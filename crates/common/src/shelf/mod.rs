//! The shelf: uploaded APKs in a blob store plus their metadata index.
//!
//! [`Shelf`] is the single entry point used by the daemon. Each operation
//! lives in its own module as an `impl Shelf` block.

mod delete;
pub mod jobs;
mod reconcile;
mod registry;
mod upload;

use object_store::BlobStore;
use serde::{Deserialize, Serialize};

use crate::index::{IndexConfig, MetadataIndex};

pub use delete::DeleteError;
pub use jobs::{run_worker, Job, JobDispatcher, JobReceiver};
pub use reconcile::{LinkRef, ReconcileError, ReconcileOptions, ReconcileReport};
pub use registry::{display_filename, FileView};
pub use upload::{
    storage_pathname, validate, UploadError, APK_CONTENT_TYPE, DEFAULT_MAX_UPLOAD_BYTES,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShelfConfig {
    pub max_upload_bytes: u64,
    /// Drop a file's download counter when the file is deleted.
    pub prune_download_counts: bool,
    pub index: IndexConfig,
}

impl Default for ShelfConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            prune_download_counts: false,
            index: IndexConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Shelf {
    store: BlobStore,
    index: MetadataIndex,
    config: ShelfConfig,
}

impl Shelf {
    pub fn new(store: BlobStore, config: ShelfConfig) -> Self {
        let index = MetadataIndex::new(store.clone(), &config.index);
        Self {
            store,
            index,
            config,
        }
    }

    pub fn store(&self) -> &BlobStore {
        &self.store
    }

    pub fn index(&self) -> &MetadataIndex {
        &self.index
    }

    pub fn config(&self) -> &ShelfConfig {
        &self.config
    }
}
