//! Typed access to cached collections in a [`LocalStore`].

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{CollectionName, Record};
use crate::storage::LocalStore;

/// Local record cache, one JSON array per collection
pub struct RecordCache<S> {
    store: Arc<S>,
}

impl<S: LocalStore> RecordCache<S> {
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Raw stored value, used to restore the cache after a failed cycle
    pub async fn load_raw(&self, collection: &CollectionName) -> Result<Option<String>> {
        self.store.load(collection.as_str()).await
    }

    /// Cached records; an uncached collection is empty
    pub async fn records(&self, collection: &CollectionName) -> Result<Vec<Record>> {
        match self.load_raw(collection).await? {
            Some(raw) => parse_records(&raw),
            None => Ok(Vec::new()),
        }
    }

    /// Replace the cached collection
    pub async fn save(&self, collection: &CollectionName, records: &[Record]) -> Result<()> {
        let raw = serde_json::to_string(records)?;
        self.store.save(collection.as_str(), &raw).await
    }

    /// Write back a value captured by [`load_raw`](Self::load_raw); `None` removes the entry
    pub async fn restore(&self, collection: &CollectionName, previous: Option<&str>) -> Result<()> {
        match previous {
            Some(raw) => self.store.save(collection.as_str(), raw).await,
            None => self.store.remove(collection.as_str()).await.map(|_| ()),
        }
    }

    /// Drop the cached collection
    pub async fn clear(&self, collection: &CollectionName) -> Result<bool> {
        self.store.remove(collection.as_str()).await
    }
}

pub(crate) fn parse_records(raw: &str) -> Result<Vec<Record>> {
    serde_json::from_str(raw).map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn students() -> CollectionName {
        CollectionName::new("students").unwrap()
    }

    #[tokio::test]
    async fn test_uncached_collection_is_empty() {
        let cache = RecordCache::new(Arc::new(MemoryStore::new()));
        assert!(cache.records(&students()).await.unwrap().is_empty());
        assert_eq!(cache.load_raw(&students()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_and_read_back() {
        let cache = RecordCache::new(Arc::new(MemoryStore::new()));
        let records = vec![
            Record::new("1")
                .with_updated_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
                .with_attribute("name", "Ada"),
            Record::new("2"),
        ];

        cache.save(&students(), &records).await.unwrap();
        assert_eq!(cache.records(&students()).await.unwrap(), records);
    }

    #[tokio::test]
    async fn test_restore_previous_or_absent() {
        let cache = RecordCache::new(Arc::new(MemoryStore::new()));
        cache.save(&students(), &[Record::new("1")]).await.unwrap();
        let previous = cache.load_raw(&students()).await.unwrap();

        cache.save(&students(), &[Record::new("2")]).await.unwrap();
        cache.restore(&students(), previous.as_deref()).await.unwrap();
        assert_eq!(cache.records(&students()).await.unwrap(), vec![Record::new("1")]);

        cache.restore(&students(), None).await.unwrap();
        assert_eq!(cache.load_raw(&students()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_value_is_an_error() {
        let store = MemoryStore::with_entries([("students", "{broken")]);
        let cache = RecordCache::new(Arc::new(store));
        assert!(matches!(
            cache.records(&students()).await,
            Err(Error::Serialization(_))
        ));
    }
}
