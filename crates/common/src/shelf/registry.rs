//! File listing joined with the short-link table.

use std::collections::HashMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use object_store::{BlobRecord, BlobStoreError};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Shelf;
use crate::index::FILES_PREFIX;

/// A stored file as presented to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileView {
    pub url: String,
    pub pathname: String,
    pub filename: String,
    pub size: u64,
    pub uploaded_at: DateTime<Utc>,
    pub short_code: Option<String>,
}

impl FileView {
    pub(crate) fn from_record(
        record: BlobRecord,
        filename: String,
        short_code: Option<String>,
    ) -> Self {
        Self {
            url: record.url.to_string(),
            pathname: record.pathname,
            filename,
            size: record.size,
            uploaded_at: record.uploaded_at,
            short_code,
        }
    }
}

/// Human-facing name for a stored pathname: the `apk/` prefix and the
/// random upload suffix are dropped.
pub fn display_filename(pathname: &str) -> String {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let suffix = SUFFIX.get_or_init(|| {
        Regex::new(r"-[a-zA-Z0-9]+\.apk$").expect("static regex is valid")
    });

    let name = pathname
        .strip_prefix(FILES_PREFIX)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(pathname);
    suffix.replace(name, ".apk").into_owned()
}

impl Shelf {
    /// List every stored file with its short code, in storage order.
    pub async fn list_files(&self) -> Result<Vec<FileView>, BlobStoreError> {
        let (records, links) = futures::join!(
            self.store.list(FILES_PREFIX),
            self.index.short_links().load()
        );
        let records = records?;

        let mut code_by_url: HashMap<String, String> = HashMap::with_capacity(links.len());
        for (code, entry) in links {
            code_by_url.insert(entry.url, code);
        }

        Ok(records
            .into_iter()
            .map(|record| {
                let filename = display_filename(&record.pathname);
                let short_code = code_by_url.get(record.url.as_str()).cloned();
                FileView::from_record(record, filename, short_code)
            })
            .collect())
    }
}
