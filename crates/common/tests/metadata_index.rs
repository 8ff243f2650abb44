//! Integration tests for the metadata index under concurrent use

mod common;

use std::collections::HashSet;

use ::common::index::{MetadataIndex, CODE_ALPHABET};
use ::common::prelude::IndexConfig;
use object_store::BlobStore;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_are_all_kept() {
    let store = BlobStore::new_ephemeral().await.unwrap();
    let index = MetadataIndex::new(
        store,
        &IndexConfig {
            max_write_attempts: 50,
            ..Default::default()
        },
    );

    let mut handles = Vec::new();
    for i in 0..8 {
        let index = index.clone();
        handles.push(tokio::spawn(async move {
            index
                .short_links()
                .create(&format!("http://localhost/blobs/apk/f{i}.apk"), "f.apk")
                .await
        }));
    }

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap().unwrap());
    }
    assert_eq!(codes.len(), 8);

    let links = index.short_links().load().await;
    assert_eq!(links.len(), 8);
    for code in &codes {
        assert!(links.contains_key(code));
    }
}

#[tokio::test]
async fn test_two_creates_for_same_url_both_exist() {
    let store = BlobStore::new_ephemeral().await.unwrap();
    let index = MetadataIndex::new(store, &IndexConfig::default());

    let a = index.short_links().create("u", "a.apk").await.unwrap();
    let b = index.short_links().create("u", "a.apk").await.unwrap();
    assert_ne!(a, b);
    assert_eq!(index.short_links().load().await.len(), 2);
}

#[tokio::test]
async fn test_longer_codes_when_configured() {
    let store = BlobStore::new_ephemeral().await.unwrap();
    let index = MetadataIndex::new(
        store,
        &IndexConfig {
            code_length: 8,
            ..Default::default()
        },
    );
    let code = index.short_links().create("u", "a.apk").await.unwrap();
    assert_eq!(code.len(), 8);
    assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));
}

#[tokio::test]
async fn test_upload_download_delete_scenario() {
    let shelf = common::setup_test_shelf().await;

    let view = shelf
        .upload("app.apk", bytes::Bytes::from(vec![7u8; 10 * 1024]))
        .await
        .unwrap();
    let code = view.short_code.clone().unwrap();
    assert_eq!(code.len(), 4);

    let entry = shelf.index().short_links().resolve(&code).await.unwrap();
    shelf.run_job(::common::prelude::Job::RecordDownload { url: entry.url.clone() }).await;
    assert_eq!(shelf.index().downloads().get_all().await.get(&view.url), Some(&1));

    shelf.delete(&url::Url::parse(&view.url).unwrap()).await.unwrap();
    assert!(shelf.list_files().await.unwrap().is_empty());
    assert!(shelf.index().short_links().resolve(&code).await.is_none());
}
