//! Public blob store: objects addressed by pathname, exposed under a public
//! base URL, plus small versioned JSON documents used for metadata.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use object_store::path::Path;
use object_store::{ObjectMeta, PutMode, UpdateVersion};
use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{BlobStoreError, Result};
use crate::storage::{ObjectStoreConfig, Storage, StoredObject};

/// Length of the random suffix appended by [`PutBlobOptions::add_random_suffix`].
const RANDOM_SUFFIX_LEN: usize = 16;

/// A stored blob as seen by clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRecord {
    /// Public URL the blob is served from.
    pub url: Url,
    /// Storage key, e.g. `apk/app-x7Qa.apk`.
    pub pathname: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PutBlobOptions {
    pub content_type: String,
    /// Insert `-<random>` before the extension so repeated uploads never collide.
    pub add_random_suffix: bool,
}

impl Default for PutBlobOptions {
    fn default() -> Self {
        Self {
            content_type: "application/octet-stream".to_string(),
            add_random_suffix: false,
        }
    }
}

/// Opaque version token of a stored document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentVersion {
    e_tag: Option<String>,
    version: Option<String>,
}

impl DocumentVersion {
    fn from_meta(meta: &ObjectMeta) -> Self {
        Self {
            e_tag: meta.e_tag.clone(),
            version: meta.version.clone(),
        }
    }
}

/// Result of a conditional document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// Someone else wrote the document since it was read.
    Conflict,
}

#[derive(Debug, Clone)]
pub struct BlobStore {
    storage: Storage,
    public_base_url: Url,
    overwrite_warned: Arc<AtomicBool>,
}

impl BlobStore {
    pub async fn new(config: ObjectStoreConfig, public_base_url: Url) -> Result<Self> {
        let storage = Storage::new(config).await?;
        Ok(Self::with_storage(storage, public_base_url))
    }

    pub fn with_storage(storage: Storage, public_base_url: Url) -> Self {
        Self {
            storage,
            public_base_url: normalize_base(public_base_url),
            overwrite_warned: Arc::new(AtomicBool::new(false)),
        }
    }

    /// In-memory store served from `http://localhost/blobs/`. Used in tests.
    pub async fn new_ephemeral() -> Result<Self> {
        let base = Url::parse("http://localhost/blobs/")?;
        Self::new(ObjectStoreConfig::Memory, base).await
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn public_base_url(&self) -> &Url {
        &self.public_base_url
    }

    /// Public URL for a pathname.
    pub fn url_for(&self, pathname: &str) -> Result<Url> {
        Ok(self.public_base_url.join(pathname.trim_start_matches('/'))?)
    }

    /// Inverse of [`BlobStore::url_for`]. Fails with
    /// [`BlobStoreError::ForeignUrl`] for URLs outside the public base.
    pub fn pathname_for(&self, url: &Url) -> Result<String> {
        let base = &self.public_base_url;
        if url.scheme() != base.scheme()
            || url.host_str() != base.host_str()
            || url.port_or_known_default() != base.port_or_known_default()
        {
            return Err(BlobStoreError::ForeignUrl(url.to_string()));
        }
        let encoded = url
            .path()
            .strip_prefix(base.path())
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| BlobStoreError::ForeignUrl(url.to_string()))?;
        let path = Path::from_url_path(encoded)?;
        Ok(path.to_string())
    }

    /// Store a blob and return its public record.
    pub async fn put(
        &self,
        pathname: &str,
        data: Bytes,
        options: PutBlobOptions,
    ) -> Result<BlobRecord> {
        let pathname = if options.add_random_suffix {
            with_random_suffix(pathname, &mut rand::rng())
        } else {
            pathname.to_string()
        };
        let path = Path::parse(&pathname)?;
        let size = data.len() as u64;

        self.storage
            .put(&path, data, &options.content_type, PutMode::Overwrite)
            .await?;

        let record = BlobRecord {
            url: self.url_for(path.as_ref())?,
            pathname: path.to_string(),
            size,
            uploaded_at: Utc::now(),
        };
        info!(pathname = %record.pathname, size, "blob stored");
        Ok(record)
    }

    /// List blobs below `prefix` (segment based: `apk` does not match `apk-meta`).
    pub async fn list(&self, prefix: &str) -> Result<Vec<BlobRecord>> {
        let prefix = Path::parse(prefix)?;
        let objects = self.storage.list(&prefix).await?;
        debug!(prefix = %prefix, count = objects.len(), "listed blobs");

        objects
            .into_iter()
            .map(|meta| {
                Ok(BlobRecord {
                    url: self.url_for(meta.location.as_ref())?,
                    pathname: meta.location.to_string(),
                    size: meta.size as u64,
                    uploaded_at: meta.last_modified,
                })
            })
            .collect()
    }

    /// Fetch a blob by pathname.
    pub async fn get(&self, pathname: &str) -> Result<Option<StoredObject>> {
        let path = Path::parse(pathname)?;
        self.storage.get(&path).await
    }

    /// Delete the blob behind a public URL. Missing blobs are not an error.
    pub async fn delete(&self, url: &Url) -> Result<()> {
        let pathname = self.pathname_for(url)?;
        let path = Path::parse(&pathname)?;
        self.storage.delete(&path).await?;
        info!(pathname = %pathname, "blob deleted");
        Ok(())
    }

    /// Read a document together with its version.
    pub async fn read_document(
        &self,
        pathname: &str,
    ) -> Result<Option<(Bytes, DocumentVersion)>> {
        let path = Path::parse(pathname)?;
        Ok(self
            .storage
            .get(&path)
            .await?
            .map(|object| {
                let version = DocumentVersion::from_meta(&object.meta);
                (object.data, version)
            }))
    }

    /// Overwrite a document regardless of its current version.
    pub async fn overwrite_document(
        &self,
        pathname: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<()> {
        let path = Path::parse(pathname)?;
        self.storage
            .put(&path, data, content_type, PutMode::Overwrite)
            .await?;
        Ok(())
    }

    /// Write a document.
    ///
    /// With `expected == None` the write only succeeds if the document does
    /// not exist yet; otherwise only if it is still at `expected`. Backends
    /// without conditional writes overwrite unconditionally.
    pub async fn write_document(
        &self,
        pathname: &str,
        data: Bytes,
        content_type: &str,
        expected: Option<&DocumentVersion>,
    ) -> Result<WriteOutcome> {
        let path = Path::parse(pathname)?;

        let mode = if self.storage.supports_conditional_writes() {
            match expected {
                None => PutMode::Create,
                Some(version) => PutMode::Update(UpdateVersion {
                    e_tag: version.e_tag.clone(),
                    version: version.version.clone(),
                }),
            }
        } else {
            if !self.overwrite_warned.swap(true, Ordering::Relaxed) {
                warn!("backend lacks conditional writes; concurrent metadata updates may be lost");
            }
            PutMode::Overwrite
        };

        match self.storage.put(&path, data, content_type, mode).await {
            Ok(_) => Ok(WriteOutcome::Written),
            Err(BlobStoreError::ObjectStore(
                object_store::Error::AlreadyExists { .. }
                | object_store::Error::Precondition { .. },
            )) => {
                debug!(pathname = %pathname, "document write conflict");
                Ok(WriteOutcome::Conflict)
            }
            Err(e) => Err(e),
        }
    }
}

fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}

fn with_random_suffix<R: Rng + ?Sized>(pathname: &str, rng: &mut R) -> String {
    let suffix: String = (0..RANDOM_SUFFIX_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();

    let file_start = pathname.rfind('/').map(|i| i + 1).unwrap_or(0);
    match pathname[file_start..].rfind('.') {
        Some(dot) if dot > 0 => {
            let dot = file_start + dot;
            format!("{}-{}{}", &pathname[..dot], suffix, &pathname[dot..])
        }
        _ => format!("{pathname}-{suffix}"),
    }
}
