//! Thin wrapper over the `object_store` crate.
//!
//! [`Storage`] owns the configured backend (in-memory, local filesystem or an
//! S3-compatible service) and knows which optional capabilities that backend
//! has: stored content-type attributes and conditional (compare-and-swap)
//! writes.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use object_store::aws::{AmazonS3Builder, S3ConditionalPut};
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    Attribute, Attributes, ObjectMeta, ObjectStore, PutMode, PutOptions, PutPayload, PutResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{BlobStoreError, Result};

/// Object storage backend configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ObjectStoreConfig {
    /// Ephemeral in-process storage. Everything is lost on shutdown.
    Memory,
    /// Objects stored as plain files below `path`.
    Local { path: PathBuf },
    /// S3-compatible storage (AWS, MinIO, R2, ...).
    S3 {
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        #[serde(default)]
        region: Option<String>,
        /// Whether the service honours `If-Match` on PUT. Needed for
        /// conflict-free metadata updates.
        #[serde(default = "default_true")]
        conditional_put: bool,
    },
}

fn default_true() -> bool {
    true
}

impl ObjectStoreConfig {
    /// Backend name as written in config files.
    pub fn kind(&self) -> &'static str {
        match self {
            ObjectStoreConfig::Memory => "memory",
            ObjectStoreConfig::Local { .. } => "local",
            ObjectStoreConfig::S3 { .. } => "s3",
        }
    }
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        ObjectStoreConfig::Memory
    }
}

/// An object fetched from storage together with its metadata.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub data: Bytes,
    pub meta: ObjectMeta,
    pub content_type: Option<String>,
}

impl StoredObject {
    pub fn last_modified(&self) -> DateTime<Utc> {
        self.meta.last_modified
    }
}

/// Configured object storage backend.
#[derive(Debug, Clone)]
pub struct Storage {
    inner: Arc<dyn ObjectStore>,
    config: ObjectStoreConfig,
}

impl Storage {
    /// Build the backend described by `config`.
    pub async fn new(config: ObjectStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            ObjectStoreConfig::Memory => {
                info!("using in-memory object storage");
                Arc::new(InMemory::new())
            }
            ObjectStoreConfig::Local { path } => {
                if !path.is_absolute() {
                    return Err(BlobStoreError::Config(format!(
                        "local storage path must be absolute: {}",
                        path.display()
                    )));
                }
                tokio::fs::create_dir_all(path).await?;
                info!(path = %path.display(), "using local filesystem object storage");
                Arc::new(LocalFileSystem::new_with_prefix(path)?)
            }
            ObjectStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
                conditional_put,
            } => {
                info!(
                    endpoint = %endpoint,
                    bucket = %bucket,
                    conditional_put,
                    "using S3-compatible object storage"
                );
                let mut builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));
                if *conditional_put {
                    builder = builder.with_conditional_put(S3ConditionalPut::ETagMatch);
                }
                Arc::new(builder.build()?)
            }
        };

        Ok(Self { inner, config })
    }

    /// Wrap an already built backend. `config` describes its capabilities.
    pub fn from_object_store(inner: Arc<dyn ObjectStore>, config: ObjectStoreConfig) -> Self {
        Self { inner, config }
    }

    pub fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }

    /// Whether the backend persists object attributes such as the content type.
    pub fn supports_attributes(&self) -> bool {
        !matches!(self.config, ObjectStoreConfig::Local { .. })
    }

    /// Whether the backend implements [`PutMode::Update`].
    pub fn supports_conditional_writes(&self) -> bool {
        match &self.config {
            ObjectStoreConfig::Memory => true,
            ObjectStoreConfig::Local { .. } => false,
            ObjectStoreConfig::S3 {
                conditional_put, ..
            } => *conditional_put,
        }
    }

    /// Write `data` at `path` using the given put mode.
    pub async fn put(
        &self,
        path: &Path,
        data: Bytes,
        content_type: &str,
        mode: PutMode,
    ) -> Result<PutResult> {
        let mut attributes = Attributes::new();
        if self.supports_attributes() {
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
        }
        let options = PutOptions {
            mode,
            attributes,
            ..Default::default()
        };
        debug!(path = %path, size = data.len(), "putting object");
        let result = self
            .inner
            .put_opts(path, PutPayload::from(data), options)
            .await?;
        Ok(result)
    }

    /// Fetch an object. Returns `None` if it does not exist.
    pub async fn get(&self, path: &Path) -> Result<Option<StoredObject>> {
        let result = match self.inner.get(path).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta = result.meta.clone();
        let content_type = result.attributes.get(&Attribute::ContentType).map(|value| {
            let value: &str = value.as_ref();
            value.to_string()
        });
        let data = result.bytes().await?;
        Ok(Some(StoredObject {
            data,
            meta,
            content_type,
        }))
    }

    /// List every object under `prefix`.
    pub async fn list(&self, prefix: &Path) -> Result<Vec<ObjectMeta>> {
        let objects: Vec<ObjectMeta> = self.inner.list(Some(prefix)).try_collect().await?;
        Ok(objects)
    }

    /// Delete an object. Deleting a missing object is not an error.
    pub async fn delete(&self, path: &Path) -> Result<()> {
        match self.inner.delete(path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
