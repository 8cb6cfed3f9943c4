use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use smartsync_core::models::SYNC_METADATA_KEY;
use smartsync_core::storage::LocalStore;
use smartsync_core::sync::{RecordCache, TimestampStore};
use smartsync_core::CollectionName;

use crate::commands::common::{format_relative_time, format_timestamp, Context};
use crate::error::CliError;

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusItem {
    pub collection: String,
    pub last_synced: Option<DateTime<Utc>>,
    /// `None` when the cached value cannot be parsed
    pub cached_records: Option<usize>,
}

pub async fn run_status(as_json: bool, context: &Context) -> Result<(), CliError> {
    let configured = context.config.collections()?;
    let store = context.open_store().await?;
    let items = collect_status(store, &configured).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No collections configured or cached.");
        return Ok(());
    }

    for line in format_status_lines(&items, Utc::now()) {
        println!("{line}");
    }
    Ok(())
}

/// Configured, synced, and cached collections, sorted by name
pub async fn collect_status<S: LocalStore>(
    store: Arc<S>,
    configured: &[CollectionName],
) -> Result<Vec<StatusItem>, CliError> {
    let timestamps = TimestampStore::new(Arc::clone(&store));
    let cache = RecordCache::new(Arc::clone(&store));
    let metadata = timestamps.snapshot().await?;

    let mut names = configured
        .iter()
        .map(|collection| collection.as_str().to_string())
        .collect::<BTreeSet<_>>();
    names.extend(metadata.iter().map(|(name, _)| name.to_string()));
    names.extend(
        store
            .keys()
            .await?
            .into_iter()
            .filter(|key| key != SYNC_METADATA_KEY),
    );

    let mut items = Vec::with_capacity(names.len());
    for name in names {
        let Ok(collection) = CollectionName::new(&name) else {
            tracing::debug!("Skipping non-collection key '{}'", name);
            continue;
        };
        let cached_records = match cache.records(&collection).await {
            Ok(records) => Some(records.len()),
            Err(smartsync_core::Error::Serialization(_)) => None,
            Err(error) => return Err(error.into()),
        };
        items.push(StatusItem {
            last_synced: metadata.last_synced(&collection),
            collection: name,
            cached_records,
        });
    }
    Ok(items)
}

pub fn format_status_lines(items: &[StatusItem], now: DateTime<Utc>) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let synced = item.last_synced.map_or_else(
                || "never synced".to_string(),
                |at| {
                    format!(
                        "synced {} ({})",
                        format_relative_time(at, now),
                        format_timestamp(at)
                    )
                },
            );
            let cached = item.cached_records.map_or_else(
                || {
                    format!(
                        "cache unreadable, run `smartsync reset {} --cache`",
                        item.collection
                    )
                },
                |count| format!("{count} cached"),
            );
            format!("{:<20}  {synced:<45}  {cached}", item.collection)
        })
        .collect()
}
