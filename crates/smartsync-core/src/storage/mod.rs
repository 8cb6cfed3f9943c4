//! Local persistence interface for cached collections and sync metadata.
//!
//! Values are opaque JSON text keyed by collection name; the reserved key
//! [`SYNC_METADATA_KEY`](crate::models::SYNC_METADATA_KEY) holds the sync
//! metadata map.

mod memory;

pub use memory::MemoryStore;

use crate::error::Result;

/// Trait for keyed local persistence (async)
#[allow(async_fn_in_trait)]
pub trait LocalStore {
    /// Load the value stored under `key`, or `None` when absent
    async fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`; must either fully succeed or leave the old value
    async fn save(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`; returns whether a value existed
    async fn remove(&self, key: &str) -> Result<bool>;

    /// All keys currently stored, sorted
    async fn keys(&self) -> Result<Vec<String>>;
}

impl<T: LocalStore> LocalStore for std::sync::Arc<T> {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key).await
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        (**self).remove(key).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        (**self).keys().await
    }
}
