use futures::future::OptionFuture;
use object_store::BlobStoreError;
use tracing::{error, info, warn};
use url::Url;

use super::Shelf;
use crate::index::FILES_PREFIX;

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("not a file of this shelf: {0}")]
    ForeignUrl(String),
    #[error("Delete failed")]
    Failed,
}

/// Only uploaded files live under `apk/`; the metadata documents do not.
fn is_file_pathname(pathname: &str) -> bool {
    pathname
        .strip_prefix(FILES_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .is_some_and(|name| !name.is_empty())
}

impl Shelf {
    /// Delete a file and its short link.
    ///
    /// The blob deletion and the link removal (plus the counter removal when
    /// pruning is enabled) run concurrently and are always both awaited. If
    /// any of them fails the whole operation fails; nothing is rolled back.
    pub async fn delete(&self, url: &Url) -> Result<(), DeleteError> {
        match self.store.pathname_for(url) {
            Ok(pathname) if is_file_pathname(&pathname) => {}
            Ok(pathname) => {
                warn!(url = %url, pathname = %pathname, "refusing to delete non-file object");
                return Err(DeleteError::ForeignUrl(url.to_string()));
            }
            Err(BlobStoreError::ForeignUrl(url)) => return Err(DeleteError::ForeignUrl(url)),
            Err(e) => {
                error!(url = %url, error = %e, "invalid file url");
                return Err(DeleteError::ForeignUrl(url.to_string()));
            }
        }

        let prune: OptionFuture<_> = self
            .config
            .prune_download_counts
            .then(|| self.index.downloads().remove(url.as_str()))
            .into();

        let (blob, link, counts) = futures::join!(
            self.store.delete(url),
            self.index.short_links().remove_by_url(url.as_str()),
            prune,
        );

        let mut failed = false;
        if let Err(e) = blob {
            error!(url = %url, error = %e, "failed to delete blob");
            failed = true;
        }
        if let Err(e) = link {
            error!(url = %url, error = %e, "failed to remove short link");
            failed = true;
        }
        if let Some(Err(e)) = counts {
            error!(url = %url, error = %e, "failed to prune download count");
            failed = true;
        }
        if failed {
            return Err(DeleteError::Failed);
        }

        info!(url = %url, "file deleted");
        Ok(())
    }
}
