//! Consistency check between stored files and the metadata index.

use std::collections::HashSet;

use object_store::BlobStoreError;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::registry::display_filename;
use super::Shelf;
use crate::index::{IndexError, FILES_PREFIX};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconcileOptions {
    /// Only report, change nothing.
    pub dry_run: bool,
    /// Create short links for files that have none.
    pub relink: bool,
    /// Remove download counters of files that no longer exist.
    pub prune_download_counts: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkRef {
    pub code: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub dry_run: bool,
    /// Short links pointing at files that do not exist.
    pub orphaned_links: Vec<LinkRef>,
    /// Files without a short link.
    pub unlinked_files: Vec<String>,
    /// Download counters for files that do not exist.
    pub stale_counts: Vec<String>,
    pub removed_links: usize,
    pub created_links: Vec<LinkRef>,
    pub pruned_counts: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("failed to list files: {0}")]
    Listing(#[from] BlobStoreError),
    #[error("metadata index error: {0}")]
    Index(#[from] IndexError),
}

impl Shelf {
    pub async fn reconcile(
        &self,
        options: ReconcileOptions,
    ) -> Result<ReconcileReport, ReconcileError> {
        // An unreadable table is an error here, never an empty one.
        let (records, links, counts) = futures::join!(
            self.store.list(FILES_PREFIX),
            self.index.short_links().try_load(),
            self.index.downloads().try_load(),
        );
        let (records, links, counts) = (records?, links?, counts?);

        let file_urls: HashSet<String> = records.iter().map(|r| r.url.to_string()).collect();
        let linked_urls: HashSet<&str> = links.values().map(|e| e.url.as_str()).collect();

        let mut report = ReconcileReport {
            dry_run: options.dry_run,
            orphaned_links: links
                .iter()
                .filter(|(_, entry)| !file_urls.contains(&entry.url))
                .map(|(code, entry)| LinkRef {
                    code: code.clone(),
                    url: entry.url.clone(),
                })
                .collect(),
            unlinked_files: records
                .iter()
                .map(|r| r.url.to_string())
                .filter(|url| !linked_urls.contains(url.as_str()))
                .collect(),
            stale_counts: counts
                .keys()
                .filter(|url| !file_urls.contains(*url))
                .cloned()
                .collect(),
            ..Default::default()
        };

        if options.dry_run {
            info!(
                orphaned_links = report.orphaned_links.len(),
                unlinked_files = report.unlinked_files.len(),
                stale_counts = report.stale_counts.len(),
                "reconcile dry run"
            );
            return Ok(report);
        }

        if !report.orphaned_links.is_empty() {
            let codes: Vec<String> = report.orphaned_links.iter().map(|l| l.code.clone()).collect();
            report.removed_links = self.index.short_links().remove_codes(&codes).await?;
        }

        if options.relink {
            let unlinked = records
                .iter()
                .filter(|r| report.unlinked_files.contains(&r.url.to_string()));
            for record in unlinked {
                let url = record.url.to_string();
                match self
                    .index
                    .short_links()
                    .create(&url, &display_filename(&record.pathname))
                    .await
                {
                    Ok(code) => report.created_links.push(LinkRef { code, url }),
                    Err(e) => warn!(url = %url, error = %e, "failed to relink file"),
                }
            }
        }

        if (options.prune_download_counts || self.config.prune_download_counts)
            && !report.stale_counts.is_empty()
        {
            report.pruned_counts = self.index.downloads().remove_many(&report.stale_counts).await?;
        }

        info!(
            removed_links = report.removed_links,
            created_links = report.created_links.len(),
            pruned_counts = report.pruned_counts,
            "reconcile finished"
        );
        Ok(report)
    }
}
