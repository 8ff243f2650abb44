use common::shelf::{run_worker, JobDispatcher, Shelf};
use object_store::{BlobStore, BlobStoreError};
use url::Url;

use super::service_config::Config;

/// Main service state shared by every request handler.
#[derive(Debug, Clone)]
pub struct State {
    shelf: Shelf,
    jobs: JobDispatcher,
}

impl State {
    /// Open the configured blob store, serving blobs from `public_base_url`.
    pub async fn from_config(
        config: &Config,
        public_base_url: Url,
    ) -> Result<Self, StateSetupError> {
        tracing::debug!("ServiceState::from_config - opening blob store");
        let store = BlobStore::new(config.blob_store.clone(), public_base_url).await?;
        tracing::info!(public_base_url = %store.public_base_url(), "blob store ready");

        Ok(Self::new(Shelf::new(store, config.shelf.clone())))
    }

    /// Wrap a shelf and spawn the background job worker for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(shelf: Shelf) -> Self {
        let (jobs, receiver) = JobDispatcher::new();
        tokio::spawn(run_worker(shelf.clone(), receiver));
        Self { shelf, jobs }
    }

    pub fn shelf(&self) -> &Shelf {
        &self.shelf
    }

    pub fn jobs(&self) -> &JobDispatcher {
        &self.jobs
    }
}

impl AsRef<Shelf> for State {
    fn as_ref(&self) -> &Shelf {
        &self.shelf
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("Blob store error: {0}")]
    BlobStore(#[from] BlobStoreError),
}
