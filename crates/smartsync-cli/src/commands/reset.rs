use std::sync::Arc;

use smartsync_core::models::SYNC_METADATA_KEY;
use smartsync_core::storage::LocalStore;
use smartsync_core::sync::{RecordCache, TimestampStore};
use smartsync_core::CollectionName;

use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_reset(
    collection: Option<&str>,
    all: bool,
    drop_cache: bool,
    context: &Context,
) -> Result<(), CliError> {
    let store = context.open_store().await?;

    if all {
        let cleared = reset_all(store, drop_cache).await?;
        if drop_cache {
            println!("Reset all collections and cleared {cleared} cache(s)");
        } else {
            println!("Reset all collections");
        }
        return Ok(());
    }

    // clap requires a collection whenever --all is absent
    let collection = CollectionName::new(collection.unwrap_or_default())?;
    let (had_metadata, had_cache) = reset_collection(store, &collection, drop_cache).await?;

    if had_metadata {
        println!("Reset '{collection}'; next sync fetches everything");
    } else {
        println!("'{collection}' has not been synced yet");
    }
    if had_cache {
        println!("Cleared cached records for '{collection}'");
    }
    Ok(())
}

/// Returns whether metadata and cached records existed
pub async fn reset_collection<S: LocalStore>(
    store: Arc<S>,
    collection: &CollectionName,
    drop_cache: bool,
) -> Result<(bool, bool), CliError> {
    let had_metadata = TimestampStore::new(Arc::clone(&store))
        .reset(collection)
        .await?;
    let had_cache = if drop_cache {
        RecordCache::new(store).clear(collection).await?
    } else {
        false
    };
    Ok((had_metadata, had_cache))
}

/// Returns the number of cached collections dropped
pub async fn reset_all<S: LocalStore>(store: Arc<S>, drop_cache: bool) -> Result<usize, CliError> {
    TimestampStore::new(Arc::clone(&store)).reset_all().await?;
    if !drop_cache {
        return Ok(0);
    }

    let cache = RecordCache::new(Arc::clone(&store));
    let mut cleared = 0;
    for key in store.keys().await? {
        if key == SYNC_METADATA_KEY {
            continue;
        }
        if let Ok(collection) = CollectionName::new(&key) {
            if cache.clear(&collection).await? {
                cleared += 1;
            }
        }
    }
    Ok(cleared)
}
