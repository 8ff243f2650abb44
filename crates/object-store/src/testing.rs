//! Fault injection for tests: an in-memory store whose operations can be
//! made to fail for chosen path prefixes.

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{
    GetOptions, GetResult, ListResult, MultipartUpload, ObjectMeta, ObjectStore,
    PutMultipartOpts, PutOptions, PutPayload, PutResult,
};
use url::Url;

use crate::{BlobStore, ObjectStoreConfig, Result, Storage};

/// Operation class a failure rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Put,
    Delete,
    List,
}

#[derive(Debug, Default)]
pub struct FailingStore {
    inner: InMemory,
    rules: Mutex<Vec<(Operation, String)>>,
}

impl FailingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `operation` fail for every path starting with `prefix`.
    pub fn fail(&self, operation: Operation, prefix: &str) {
        self.lock().push((operation, prefix.to_string()));
    }

    pub fn heal(&self) {
        self.lock().clear();
    }

    /// Blob store over this backend, served from `http://localhost/blobs/`.
    pub fn blob_store(self: &Arc<Self>) -> Result<BlobStore> {
        let storage = Storage::from_object_store(self.clone(), ObjectStoreConfig::Memory);
        let base = Url::parse("http://localhost/blobs/")?;
        Ok(BlobStore::with_storage(storage, base))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Operation, String)>> {
        self.rules.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check(&self, operation: Operation, path: &str) -> object_store::Result<()> {
        let failing = self
            .lock()
            .iter()
            .any(|(op, prefix)| *op == operation && path.starts_with(prefix.as_str()));
        if failing {
            return Err(object_store::Error::Generic {
                store: "FailingStore",
                source: format!("injected {operation:?} failure for {path}").into(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for FailingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailingStore({})", self.inner)
    }
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.check(Operation::Put, location.as_ref())?;
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOpts,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.check(Operation::Put, location.as_ref())?;
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.check(Operation::Get, location.as_ref())?;
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        self.check(Operation::Delete, location.as_ref())?;
        self.inner.delete(location).await
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'_, object_store::Result<ObjectMeta>> {
        let path = prefix.map(|p| p.to_string()).unwrap_or_default();
        match self.check(Operation::List, &path) {
            Ok(()) => self.inner.list(prefix),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }

    async fn list_with_delimiter(
        &self,
        prefix: Option<&Path>,
    ) -> object_store::Result<ListResult> {
        let path = prefix.map(|p| p.to_string()).unwrap_or_default();
        self.check(Operation::List, &path)?;
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.check(Operation::Put, to.as_ref())?;
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.check(Operation::Put, to.as_ref())?;
        self.inner.copy_if_not_exists(from, to).await
    }
}
