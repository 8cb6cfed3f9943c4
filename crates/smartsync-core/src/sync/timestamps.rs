//! Per-collection last-sync instants, persisted under the reserved metadata key.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{CollectionName, SyncMetadata, SYNC_METADATA_KEY};
use crate::storage::LocalStore;

/// Reset generation a cycle observed when it read its last-sync instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetEpoch {
    all: u64,
    collection: u64,
}

#[derive(Debug, Default)]
struct Epochs {
    all: u64,
    collections: HashMap<CollectionName, u64>,
}

/// Sole writer of [`SyncMetadata`].
///
/// Every collection shares one stored map, so read-modify-write cycles are
/// serialized by an internal lock even when collections sync concurrently.
/// Resets bump an in-process epoch; cycle writes tagged with an older epoch
/// are dropped so a reset made mid-cycle survives the cycle's commit or
/// rollback.
pub struct TimestampStore<S> {
    store: Arc<S>,
    write_lock: Mutex<()>,
    epochs: std::sync::Mutex<Epochs>,
}

impl<S: LocalStore> TimestampStore<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            epochs: std::sync::Mutex::default(),
        }
    }

    /// Last-sync instant plus the reset epoch it belongs to
    pub async fn begin(
        &self,
        collection: &CollectionName,
    ) -> Result<(Option<DateTime<Utc>>, ResetEpoch)> {
        let _guard = self.write_lock.lock().await;
        let since = self.snapshot().await?.last_synced(collection);
        Ok((since, self.epoch(collection)))
    }

    /// Current metadata. A missing entry yields an empty map; an unreadable
    /// one is logged and treated as empty so the next cycle does a full fetch.
    pub async fn snapshot(&self) -> Result<SyncMetadata> {
        let Some(raw) = self.store.load(SYNC_METADATA_KEY).await? else {
            return Ok(SyncMetadata::default());
        };

        match serde_json::from_str(&raw) {
            Ok(metadata) => Ok(metadata),
            Err(error) => {
                tracing::warn!(
                    "Ignoring unreadable sync metadata ({}); collections will fully resync",
                    error
                );
                Ok(SyncMetadata::default())
            }
        }
    }

    /// Instant of the collection's last successful sync
    pub async fn last_synced(&self, collection: &CollectionName) -> Result<Option<DateTime<Utc>>> {
        Ok(self.snapshot().await?.last_synced(collection))
    }

    /// Record a successful sync at `instant`
    pub async fn advance(&self, collection: &CollectionName, instant: DateTime<Utc>) -> Result<()> {
        self.restore(collection, Some(instant)).await
    }

    /// Put the collection's entry back to `previous` (removing it when `None`)
    pub async fn restore(
        &self,
        collection: &CollectionName,
        previous: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_entry(collection, previous).await
    }

    /// [`advance`](Self::advance) unless the collection was reset after `epoch`.
    /// Returns whether the entry was written.
    pub async fn advance_unless_reset(
        &self,
        collection: &CollectionName,
        instant: DateTime<Utc>,
        epoch: ResetEpoch,
    ) -> Result<bool> {
        self.restore_unless_reset(collection, Some(instant), epoch)
            .await
    }

    /// [`restore`](Self::restore) unless the collection was reset after `epoch`.
    /// Returns whether the entry was written.
    pub async fn restore_unless_reset(
        &self,
        collection: &CollectionName,
        previous: Option<DateTime<Utc>>,
        epoch: ResetEpoch,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        if self.epoch(collection) != epoch {
            tracing::info!(
                "'{}' was reset during sync; leaving its metadata cleared",
                collection
            );
            return Ok(false);
        }
        self.write_entry(collection, previous).await?;
        Ok(true)
    }

    /// Forget one collection so its next cycle is a first sync
    pub async fn reset(&self, collection: &CollectionName) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        self.bump_epoch(Some(collection));
        let mut metadata = self.snapshot().await?;
        if !metadata.remove(collection) {
            return Ok(false);
        }
        self.write(&metadata).await?;
        tracing::info!("Reset sync metadata for '{}'", collection);
        Ok(true)
    }

    /// Forget every collection
    pub async fn reset_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.bump_epoch(None);
        self.store.remove(SYNC_METADATA_KEY).await?;
        tracing::info!("Reset all sync metadata");
        Ok(())
    }

    fn epoch(&self, collection: &CollectionName) -> ResetEpoch {
        let epochs = self.epochs.lock().unwrap_or_else(PoisonError::into_inner);
        ResetEpoch {
            all: epochs.all,
            collection: epochs.collections.get(collection).copied().unwrap_or(0),
        }
    }

    fn bump_epoch(&self, collection: Option<&CollectionName>) {
        let mut epochs = self.epochs.lock().unwrap_or_else(PoisonError::into_inner);
        match collection {
            Some(collection) => *epochs.collections.entry(collection.clone()).or_insert(0) += 1,
            None => epochs.all += 1,
        }
    }

    async fn write_entry(
        &self,
        collection: &CollectionName,
        value: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut metadata = self.snapshot().await?;
        // unreadable metadata stays byte-for-byte when there is nothing to change
        if metadata.last_synced(collection) == value {
            return Ok(());
        }
        match value {
            Some(instant) => metadata.set(collection, instant),
            None => {
                metadata.remove(collection);
            }
        }
        self.write(&metadata).await
    }

    async fn write(&self, metadata: &SyncMetadata) -> Result<()> {
        let raw = serde_json::to_string(metadata)?;
        self.store.save(SYNC_METADATA_KEY, &raw).await
    }
}
