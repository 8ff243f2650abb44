//! Shared setup for integration tests

use ::common::prelude::{Shelf, ShelfConfig};
use object_store::BlobStore;

/// Fresh shelf over an in-memory store.
pub async fn setup_test_shelf() -> Shelf {
    let store = BlobStore::new_ephemeral().await.unwrap();
    Shelf::new(store, ShelfConfig::default())
}
