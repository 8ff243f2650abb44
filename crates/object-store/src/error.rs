//! Error types for the object storage adapter.

/// Errors surfaced by [`BlobStore`](crate::BlobStore) and [`Storage`](crate::Storage).
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("object store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("invalid object path: {0}")]
    InvalidPath(#[from] object_store::path::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("url does not belong to this store: {0}")]
    ForeignUrl(String),

    #[error("invalid storage configuration: {0}")]
    Config(String),
}

impl BlobStoreError {
    /// Returns `true` when the object simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BlobStoreError::ObjectStore(object_store::Error::NotFound { .. })
        )
    }
}

/// Result alias for object storage operations.
pub type Result<T> = std::result::Result<T, BlobStoreError>;
