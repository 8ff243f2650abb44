//! Short-link table: `code -> {url, filename, createdAt}`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use object_store::BlobStore;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::code::CodeGenerator;
use super::document::{Document, Mutation};
use super::{IndexConfig, IndexError, LINKS_PATH};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortLinkEntry {
    pub url: String,
    pub filename: String,
    pub created_at: DateTime<Utc>,
}

pub type ShortLinks = BTreeMap<String, ShortLinkEntry>;

#[derive(Debug, Clone)]
pub struct ShortLinkTable {
    document: Document<ShortLinkEntry>,
    codes: CodeGenerator,
}

impl ShortLinkTable {
    pub fn new(store: BlobStore, config: &IndexConfig) -> Self {
        Self {
            document: Document::new(store, LINKS_PATH, config.max_write_attempts),
            codes: CodeGenerator::new(config.code_length),
        }
    }

    pub async fn load(&self) -> ShortLinks {
        self.document.load().await
    }

    /// Like [`Self::load`], but storage errors are returned instead of
    /// reading as an empty table.
    pub async fn try_load(&self) -> Result<ShortLinks, IndexError> {
        Ok(self.document.load_versioned().await?.0)
    }

    pub async fn save(&self, links: &ShortLinks) -> Result<(), IndexError> {
        self.document.save(links).await
    }

    /// Register a new short link and return its code.
    pub async fn create(&self, url: &str, filename: &str) -> Result<String, IndexError> {
        let codes = self.codes;
        let code = self
            .document
            .update(|links| {
                let code = codes.generate_unique(&mut rand::rng(), |c| links.contains_key(c))?;
                links.insert(
                    code.clone(),
                    ShortLinkEntry {
                        url: url.to_string(),
                        filename: filename.to_string(),
                        created_at: Utc::now(),
                    },
                );
                Ok(Mutation::Changed(code))
            })
            .await?;

        info!(code = %code, url = %url, "short link created");
        Ok(code)
    }

    /// Remove the entry pointing at `url`. Returns whether one was removed.
    pub async fn remove_by_url(&self, url: &str) -> Result<bool, IndexError> {
        let removed = self
            .document
            .update(|links| {
                let code = links
                    .iter()
                    .find(|(_, entry)| entry.url == url)
                    .map(|(code, _)| code.clone());
                Ok(match code {
                    Some(code) => {
                        links.remove(&code);
                        Mutation::Changed(Some(code))
                    }
                    None => Mutation::Unchanged(None),
                })
            })
            .await?;

        if let Some(code) = &removed {
            info!(code = %code, url = %url, "short link removed");
        }
        Ok(removed.is_some())
    }

    /// Remove several codes in one write. Returns how many existed.
    pub async fn remove_codes(&self, codes: &[String]) -> Result<usize, IndexError> {
        self.document
            .update(|links| {
                let removed = codes
                    .iter()
                    .filter(|code| links.remove(code.as_str()).is_some())
                    .count();
                Ok(if removed > 0 {
                    Mutation::Changed(removed)
                } else {
                    Mutation::Unchanged(0)
                })
            })
            .await
    }

    pub async fn resolve(&self, code: &str) -> Option<ShortLinkEntry> {
        self.load().await.remove(code)
    }
}
