use bytes::Bytes;
use object_store::{BlobStoreError, PutBlobOptions};
use tracing::{error, info};

use super::registry::FileView;
use super::Shelf;
use crate::index::FILES_PREFIX;

pub const APK_CONTENT_TYPE: &str = "application/vnd.android.package-archive";

/// 20 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Only APK files are allowed")]
    NotApk,
    #[error("File too large: {size} bytes exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },
    #[error("storage error: {0}")]
    Storage(#[from] BlobStoreError),
}

/// Check the upload before anything is written.
pub fn validate(filename: &str, size: u64, max_bytes: u64) -> Result<(), UploadError> {
    if !filename.to_ascii_lowercase().ends_with(".apk") {
        return Err(UploadError::NotApk);
    }
    if size > max_bytes {
        return Err(UploadError::TooLarge {
            size,
            max: max_bytes,
        });
    }
    Ok(())
}

/// Storage pathname for an uploaded file, before the random suffix is added.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
pub fn storage_pathname(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let stem = if base.to_ascii_lowercase().ends_with(".apk") {
        &base[..base.len() - ".apk".len()]
    } else {
        base
    };

    let mut sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = sanitized.trim_matches(|c| c == '.' || c == '-').len();
    if trimmed == 0 {
        sanitized = "app".to_string();
    }

    format!("{FILES_PREFIX}/{sanitized}.apk")
}

impl Shelf {
    /// Store an APK and give it a short link.
    ///
    /// A failure to create the short link leaves the file in place; the
    /// returned view then has no short code.
    pub async fn upload(&self, filename: &str, data: Bytes) -> Result<FileView, UploadError> {
        validate(filename, data.len() as u64, self.config.max_upload_bytes)?;

        let record = self
            .store
            .put(
                &storage_pathname(filename),
                data,
                PutBlobOptions {
                    content_type: APK_CONTENT_TYPE.to_string(),
                    add_random_suffix: true,
                },
            )
            .await?;

        let short_code = match self
            .index
            .short_links()
            .create(record.url.as_str(), filename)
            .await
        {
            Ok(code) => Some(code),
            Err(e) => {
                error!(url = %record.url, error = %e, "failed to create short link for upload");
                None
            }
        };

        info!(
            pathname = %record.pathname,
            size = record.size,
            short_code = ?short_code,
            "apk uploaded"
        );
        Ok(FileView::from_record(record, filename.to_string(), short_code))
    }
}

#[cfg(test)]
mod tests {
    use object_store::testing::Operation;

    use super::*;
    use crate::shelf::tests::{failing_shelf, shelf, shelf_with};
    use crate::shelf::ShelfConfig;

    #[test]
    fn test_validate() {
        assert!(validate("app.apk", 10, 100).is_ok());
        assert!(validate("APP.APK", 10, 100).is_ok());
        assert!(validate("app.apk", 100, 100).is_ok());
        assert!(matches!(validate("app.txt", 10, 100), Err(UploadError::NotApk)));
        assert!(matches!(validate("apk", 10, 100), Err(UploadError::NotApk)));
        assert!(matches!(
            validate("app.apk", 101, 100),
            Err(UploadError::TooLarge { size: 101, max: 100 })
        ));
        // Extension is checked first.
        assert!(matches!(validate("app.zip", 101, 100), Err(UploadError::NotApk)));
    }

    #[test]
    fn test_storage_pathname() {
        assert_eq!(storage_pathname("app.apk"), "apk/app.apk");
        assert_eq!(storage_pathname("My App (1).APK"), "apk/My_App__1_.apk");
        assert_eq!(storage_pathname("../../etc/evil.apk"), "apk/evil.apk");
        assert_eq!(storage_pathname("C:\\Users\\me\\app.apk"), "apk/app.apk");
        assert_eq!(storage_pathname(".apk"), "apk/app.apk");
        assert_eq!(storage_pathname("...apk"), "apk/app.apk");
    }

    #[tokio::test]
    async fn test_upload_creates_file_and_link() {
        let shelf = shelf().await;
        let view = shelf
            .upload("app.apk", Bytes::from(vec![0u8; 10 * 1024]))
            .await
            .unwrap();

        assert_eq!(view.filename, "app.apk");
        assert_eq!(view.size, 10 * 1024);
        assert!(view.pathname.starts_with("apk/app-"));
        assert!(view.pathname.ends_with(".apk"));

        let code = view.short_code.clone().unwrap();
        let entry = shelf.index().short_links().resolve(&code).await.unwrap();
        assert_eq!(entry.url, view.url);

        let stored = shelf.store().get(&view.pathname).await.unwrap().unwrap();
        assert_eq!(stored.content_type.as_deref(), Some(APK_CONTENT_TYPE));

        let listed = shelf.list_files().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].filename, "app.apk");
        assert_eq!(listed[0].short_code, view.short_code);
    }

    #[tokio::test]
    async fn test_same_name_uploads_do_not_collide() {
        let shelf = shelf().await;
        let a = shelf.upload("app.apk", Bytes::from_static(b"a")).await.unwrap();
        let b = shelf.upload("app.apk", Bytes::from_static(b"b")).await.unwrap();
        assert_ne!(a.url, b.url);
        assert_ne!(a.short_code, b.short_code);
        assert_eq!(shelf.list_files().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_rejected_upload_writes_nothing() {
        let shelf = shelf_with(ShelfConfig {
            max_upload_bytes: 4,
            ..Default::default()
        })
        .await;

        let err = shelf.upload("app.txt", Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, UploadError::NotApk));
        let err = shelf.upload("app.apk", Bytes::from_static(b"12345")).await.unwrap_err();
        assert!(matches!(err, UploadError::TooLarge { .. }));

        assert!(shelf.list_files().await.unwrap().is_empty());
        assert!(shelf.index().short_links().load().await.is_empty());
    }

    #[tokio::test]
    async fn test_upload_survives_link_failure() {
        let (backend, shelf) = failing_shelf().await;
        backend.fail(Operation::Put, "apk-meta");

        let view = shelf.upload("app.apk", Bytes::from_static(b"apk")).await.unwrap();
        assert_eq!(view.short_code, None);

        backend.heal();
        let files = shelf.list_files().await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].url, view.url);
        assert_eq!(files[0].short_code, None);
        assert!(shelf.index().short_links().load().await.is_empty());
    }
}
