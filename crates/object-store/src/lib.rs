//! Object storage for apkshelf.
//!
//! [`Storage`] wraps a configured `object_store` backend. [`BlobStore`] builds
//! on it to address blobs by pathname, map them to public URLs and perform
//! version-checked writes of small metadata documents.

mod blob_store;
mod error;
mod storage;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use blob_store::{BlobRecord, BlobStore, DocumentVersion, PutBlobOptions, WriteOutcome};
pub use error::{BlobStoreError, Result};
pub use storage::{ObjectStoreConfig, Storage, StoredObject};
