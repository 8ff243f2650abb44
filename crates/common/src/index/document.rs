//! A JSON object persisted as a single object-store document.
//!
//! Both metadata tables are flat `key -> entry` objects, so a document is
//! parsed entry by entry: an entry that does not fit the schema is dropped
//! on its own and never takes its neighbours with it.

use std::collections::BTreeMap;
use std::marker::PhantomData;

use bytes::Bytes;
use object_store::{BlobStore, DocumentVersion, WriteOutcome};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use super::IndexError;

const JSON_CONTENT_TYPE: &str = "application/json";

/// What a mutation closure did to the value it was handed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation<R> {
    /// The value changed and must be written back.
    Changed(R),
    /// Nothing to write.
    Unchanged(R),
}

/// Typed handle on one JSON document holding a `String -> V` table.
///
/// Reads are fail-open: a missing or unreadable document is the empty
/// table. Mutations go through [`Document::update`], which retries on
/// concurrent writers.
#[derive(Debug, Clone)]
pub struct Document<V> {
    store: BlobStore,
    pathname: &'static str,
    max_attempts: u32,
    _value: PhantomData<fn() -> V>,
}

impl<V> Document<V>
where
    V: Serialize + DeserializeOwned + Send,
{
    pub fn new(store: BlobStore, pathname: &'static str, max_attempts: u32) -> Self {
        Self {
            store,
            pathname,
            max_attempts: max_attempts.max(1),
            _value: PhantomData,
        }
    }

    pub fn pathname(&self) -> &'static str {
        self.pathname
    }

    /// Load the document. Never fails.
    pub async fn load(&self) -> BTreeMap<String, V> {
        match self.store.read_document(self.pathname).await {
            Ok(Some((data, _))) => self.parse(&data),
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                warn!(
                    pathname = self.pathname,
                    error = %e,
                    "failed to read document, using empty value"
                );
                BTreeMap::new()
            }
        }
    }

    /// Load the document and its version. Storage errors propagate.
    pub async fn load_versioned(
        &self,
    ) -> Result<(BTreeMap<String, V>, Option<DocumentVersion>), IndexError> {
        match self.store.read_document(self.pathname).await? {
            Some((data, version)) => Ok((self.parse(&data), Some(version))),
            None => Ok((BTreeMap::new(), None)),
        }
    }

    /// Overwrite the whole document.
    pub async fn save(&self, value: &BTreeMap<String, V>) -> Result<(), IndexError> {
        let data = Bytes::from(serde_json::to_vec(value)?);
        self.store
            .overwrite_document(self.pathname, data, JSON_CONTENT_TYPE)
            .await?;
        debug!(pathname = self.pathname, "document saved");
        Ok(())
    }

    /// Load, apply `mutate`, and write back only if the document was not
    /// changed by someone else in between. The whole cycle is retried on
    /// conflict.
    pub async fn update<R, F>(&self, mut mutate: F) -> Result<R, IndexError>
    where
        F: FnMut(&mut BTreeMap<String, V>) -> Result<Mutation<R>, IndexError> + Send,
        R: Send,
    {
        for attempt in 1..=self.max_attempts {
            let (mut value, version) = self.load_versioned().await?;

            let result = match mutate(&mut value)? {
                Mutation::Unchanged(result) => return Ok(result),
                Mutation::Changed(result) => result,
            };

            let data = Bytes::from(serde_json::to_vec(&value)?);
            match self
                .store
                .write_document(self.pathname, data, JSON_CONTENT_TYPE, version.as_ref())
                .await?
            {
                WriteOutcome::Written => {
                    debug!(pathname = self.pathname, attempt, "document updated");
                    return Ok(result);
                }
                WriteOutcome::Conflict => {
                    debug!(pathname = self.pathname, attempt, "document changed, retrying");
                }
            }
        }

        Err(IndexError::TooManyConflicts {
            pathname: self.pathname.to_string(),
            attempts: self.max_attempts,
        })
    }

    fn parse(&self, data: &[u8]) -> BTreeMap<String, V> {
        let raw: BTreeMap<String, Value> = match serde_json::from_slice(data) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    pathname = self.pathname,
                    error = %e,
                    "document is not a JSON object, using empty value"
                );
                return BTreeMap::new();
            }
        };

        raw.into_iter()
            .filter_map(|(key, entry)| match serde_json::from_value(entry) {
                Ok(entry) => Some((key, entry)),
                Err(e) => {
                    warn!(
                        pathname = self.pathname,
                        key = %key,
                        error = %e,
                        "dropping malformed entry"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type Counts = BTreeMap<String, u64>;

    async fn doc() -> Document<u64> {
        let store = BlobStore::new_ephemeral().await.unwrap();
        Document::new(store, "apk-stats/test.json", 5)
    }

    #[tokio::test]
    async fn test_load_missing_is_default() {
        let doc = doc().await;
        assert!(doc.load().await.is_empty());
        let (value, version) = doc.load_versioned().await.unwrap();
        assert!(value.is_empty());
        assert!(version.is_none());
    }

    #[tokio::test]
    async fn test_save_load_is_stable() {
        let doc = doc().await;
        let mut counts = Counts::new();
        counts.insert("u".into(), 3);
        doc.save(&counts).await.unwrap();

        let loaded = doc.load().await;
        doc.save(&loaded).await.unwrap();
        assert_eq!(doc.load().await, counts);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_fail_open() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        store
            .overwrite_document(
                "apk-stats/test.json",
                Bytes::from_static(b"not json"),
                "application/json",
            )
            .await
            .unwrap();
        let doc: Document<u64> = Document::new(store, "apk-stats/test.json", 5);
        assert!(doc.load().await.is_empty());

        // The next mutation replaces the broken document.
        doc.update(|counts| {
            counts.insert("u".into(), 1);
            Ok(Mutation::Changed(()))
        })
        .await
        .unwrap();
        assert_eq!(doc.load().await.get("u"), Some(&1));
    }

    #[tokio::test]
    async fn test_unchanged_mutation_does_not_write() {
        let doc = doc().await;
        let result = doc.update(|_| Ok(Mutation::Unchanged(7))).await.unwrap();
        assert_eq!(result, 7);
        assert!(doc.load_versioned().await.unwrap().1.is_none());
    }

    /// Write `key` from another runtime, landing between a read and a write
    /// of the update in progress.
    fn interleave_write(doc: &Document<u64>, key: &str) {
        let doc = doc.clone();
        let key = key.to_string();
        std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async {
                let mut other = Counts::new();
                other.insert(key, 1);
                doc.save(&other).await.unwrap();
            });
        })
        .join()
        .unwrap();
    }

    #[tokio::test]
    async fn test_update_retries_after_conflict() {
        let doc = doc().await;
        doc.save(&Counts::new()).await.unwrap();

        let intruder = doc.clone();
        let mut calls = 0;
        doc.update(|counts| {
            calls += 1;
            if calls == 1 {
                interleave_write(&intruder, "other");
            }
            counts.insert("mine".into(), 1);
            Ok(Mutation::Changed(()))
        })
        .await
        .unwrap();

        assert_eq!(calls, 2);
        let counts = doc.load().await;
        assert_eq!(counts.get("other"), Some(&1));
        assert_eq!(counts.get("mine"), Some(&1));
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        let doc: Document<u64> = Document::new(store, "apk-stats/test.json", 2);
        doc.save(&Counts::new()).await.unwrap();

        let intruder = doc.clone();
        let mut calls = 0;
        let result = doc
            .update(|counts| {
                calls += 1;
                interleave_write(&intruder, &format!("other-{calls}"));
                counts.insert("mine".into(), 1);
                Ok(Mutation::Changed(()))
            })
            .await;

        assert!(matches!(
            result,
            Err(IndexError::TooManyConflicts { attempts: 2, .. })
        ));
        assert_eq!(calls, 2);
        // The losing write never landed.
        assert!(doc.load().await.get("mine").is_none());
    }

    #[tokio::test]
    async fn test_malformed_entry_does_not_take_the_table_with_it() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        store
            .overwrite_document(
                "apk-stats/test.json",
                Bytes::from_static(br#"{"good":3,"bad":"three","also-bad":-1}"#),
                "application/json",
            )
            .await
            .unwrap();
        let doc: Document<u64> = Document::new(store, "apk-stats/test.json", 5);

        let loaded = doc.load().await;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("good"), Some(&3));

        doc.update(|counts| {
            counts.insert("new".into(), 1);
            Ok(Mutation::Changed(()))
        })
        .await
        .unwrap();

        let counts = doc.load().await;
        assert_eq!(counts.get("good"), Some(&3));
        assert_eq!(counts.get("new"), Some(&1));
    }
}
