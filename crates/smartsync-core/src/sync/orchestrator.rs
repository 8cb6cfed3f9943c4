//! Sync cycle driver.
//!
//! One cycle per collection: read the cache and last-sync instant, fetch the
//! remote delta, merge, write the merged set back, then advance the instant.
//! A failed cycle never partially commits.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::cache::parse_records;
use super::{RecordCache, ResetEpoch, SyncError, TimestampStore};
use crate::merge::merge;
use crate::models::{CollectionName, Record, SyncMetadata};
use crate::remote::{FetchOutcome, RemoteFetcher, RemoteSource};
use crate::state::SyncPhase;
use crate::storage::LocalStore;

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_PERSIST_TIMEOUT: Duration = Duration::from_secs(5);

/// Runtime knobs for sync cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound for the remote fetch (including any fallback query)
    pub fetch_timeout: Duration,
    /// Upper bound for each local write, and for loading local state
    pub persist_timeout: Duration,
    /// Drop records older than the last sync from fallback (unfiltered) fetches
    pub filter_fallback_client_side: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            persist_timeout: DEFAULT_PERSIST_TIMEOUT,
            filter_fallback_client_side: false,
        }
    }
}

impl SyncOptions {
    #[must_use]
    pub const fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    #[must_use]
    pub const fn with_persist_timeout(mut self, persist_timeout: Duration) -> Self {
        self.persist_timeout = persist_timeout;
        self
    }

    #[must_use]
    pub const fn with_client_side_filter(mut self, enabled: bool) -> Self {
        self.filter_fallback_client_side = enabled;
        self
    }
}

/// Summary of a completed cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub cycle_id: Uuid,
    pub collection: CollectionName,
    /// Cycle start; becomes the collection's new last-sync instant
    pub started_at: DateTime<Utc>,
    /// Last-sync instant the delta was requested from (`None` on first sync)
    pub since: Option<DateTime<Utc>>,
    pub used_filtered_query: bool,
    pub fetched: usize,
    pub added: usize,
    pub replaced: usize,
    pub retained: usize,
    /// Records cached after the merge
    pub total: usize,
}

impl SyncReport {
    pub const fn is_first_sync(&self) -> bool {
        self.since.is_none()
    }
}

/// Drives sync cycles for any number of collections over one remote and one store.
///
/// Collections sync independently and may run concurrently; a second cycle
/// for a collection that is still syncing is rejected with
/// [`SyncError::InFlight`]. Cache reads never wait on a running cycle.
pub struct SyncOrchestrator<R, S> {
    fetcher: RemoteFetcher<R>,
    cache: RecordCache<S>,
    timestamps: TimestampStore<S>,
    options: SyncOptions,
    phases: Mutex<HashMap<CollectionName, SyncPhase>>,
    in_flight: Mutex<HashSet<CollectionName>>,
}

impl<R: RemoteSource, S: LocalStore> SyncOrchestrator<R, S> {
    pub fn new(remote: R, store: Arc<S>, options: SyncOptions) -> Self {
        Self {
            fetcher: RemoteFetcher::new(remote),
            cache: RecordCache::new(Arc::clone(&store)),
            timestamps: TimestampStore::new(store),
            options,
            phases: Mutex::default(),
            in_flight: Mutex::default(),
        }
    }

    pub const fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub const fn remote(&self) -> &R {
        self.fetcher.source()
    }

    pub const fn cache(&self) -> &RecordCache<S> {
        &self.cache
    }

    pub const fn timestamps(&self) -> &TimestampStore<S> {
        &self.timestamps
    }

    /// Phase of the collection's current or most recent cycle
    pub fn phase(&self, collection: &CollectionName) -> SyncPhase {
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(collection)
            .copied()
            .unwrap_or_default()
    }

    /// Last-known-good records, readable at any time
    pub async fn cached_records(&self, collection: &CollectionName) -> crate::Result<Vec<Record>> {
        self.cache.records(collection).await
    }

    /// Snapshot of every collection's last-sync instant
    pub async fn metadata(&self) -> crate::Result<SyncMetadata> {
        self.timestamps.snapshot().await
    }

    /// Force the collection's next cycle to be a full fetch.
    ///
    /// A cycle already running for the collection still writes its merged
    /// records but leaves the last-sync instant cleared.
    pub async fn reset(&self, collection: &CollectionName) -> crate::Result<bool> {
        self.timestamps.reset(collection).await
    }

    /// Force every collection's next cycle to be a full fetch
    pub async fn reset_all(&self) -> crate::Result<()> {
        self.timestamps.reset_all().await
    }

    /// Run one cycle for `collection`
    pub async fn sync(&self, collection: &CollectionName) -> Result<SyncReport, SyncError> {
        self.sync_with_cancel(collection, &CancellationToken::new())
            .await
    }

    /// Run one cycle, abandoning it if `cancel` fires before persisting starts.
    ///
    /// Once the cycle reaches [`SyncPhase::Persisting`] the token is ignored
    /// and the write completes or is rolled back.
    pub async fn sync_with_cancel(
        &self,
        collection: &CollectionName,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        let _guard = self.claim(collection)?;
        let cycle_id = Uuid::now_v7();
        let started_at = Utc::now();

        let result = self
            .run_cycle(collection, cycle_id, started_at, cancel)
            .await;

        match &result {
            Ok(report) => {
                self.set_phase(collection, SyncPhase::Done);
                tracing::info!(
                    "Synced '{}' ({}): fetched {} ({}), added {}, replaced {}, {} cached",
                    collection,
                    cycle_id,
                    report.fetched,
                    if report.used_filtered_query {
                        "delta"
                    } else {
                        "full"
                    },
                    report.added,
                    report.replaced,
                    report.total
                );
            }
            Err(error) => {
                self.set_phase(collection, SyncPhase::Failed);
                tracing::warn!(
                    "Sync of '{}' ({}) failed, keeping cached data: {}",
                    collection,
                    cycle_id,
                    error
                );
            }
        }

        result
    }

    /// Sync several collections concurrently.
    ///
    /// Repeated names are synced once; results follow the order in which
    /// each name first appears.
    pub async fn sync_all(
        &self,
        collections: &[CollectionName],
    ) -> Vec<(CollectionName, Result<SyncReport, SyncError>)> {
        let mut seen = HashSet::new();
        let cycles = collections
            .iter()
            .filter(|collection| seen.insert(*collection))
            .map(|collection| async move { (collection.clone(), self.sync(collection).await) });
        futures::future::join_all(cycles).await
    }

    async fn run_cycle(
        &self,
        collection: &CollectionName,
        cycle_id: Uuid,
        started_at: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> Result<SyncReport, SyncError> {
        self.set_phase(collection, SyncPhase::Fetching);

        let (since, epoch, previous_raw) = self
            .bounded(
                collection,
                cancel,
                self.options.persist_timeout,
                "Loading local state for",
                async {
                    let (since, epoch) = self
                        .timestamps
                        .begin(collection)
                        .await
                        .map_err(SyncError::Persistence)?;
                    let raw = self
                        .cache
                        .load_raw(collection)
                        .await
                        .map_err(SyncError::Persistence)?;
                    Ok::<_, SyncError>((since, epoch, raw))
                },
            )
            .await?;
        let local = match previous_raw.as_deref() {
            Some(raw) => parse_records(raw).map_err(|error| SyncError::Corrupt {
                collection: collection.clone(),
                reason: error.to_string(),
            })?,
            None => Vec::new(),
        };

        let outcome = self.fetch(collection, since, cancel).await?;
        let outcome = match since {
            Some(since) if self.options.filter_fallback_client_side => {
                outcome.filter_client_side(since)
            }
            _ => outcome,
        };

        self.set_phase(collection, SyncPhase::Merging);
        let merged = merge(&local, &outcome.records);

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled(collection.clone()));
        }

        self.set_phase(collection, SyncPhase::Persisting);
        self.persist(
            collection,
            &merged.records,
            started_at,
            epoch,
            since,
            previous_raw.as_deref(),
        )
        .await?;

        Ok(SyncReport {
            cycle_id,
            collection: collection.clone(),
            started_at,
            since,
            used_filtered_query: outcome.used_filtered_query,
            fetched: outcome.records.len(),
            added: merged.added,
            replaced: merged.replaced,
            retained: merged.retained,
            total: merged.records.len(),
        })
    }

    async fn fetch(
        &self,
        collection: &CollectionName,
        since: Option<DateTime<Utc>>,
        cancel: &CancellationToken,
    ) -> Result<FetchOutcome, SyncError> {
        self.bounded(
            collection,
            cancel,
            self.options.fetch_timeout,
            "Fetching",
            async {
                self.fetcher
                    .fetch_since(collection, since)
                    .await
                    .map_err(SyncError::from)
            },
        )
        .await
    }

    /// Run pre-persist work under `bound`, giving up early if `cancel` fires
    async fn bounded<T>(
        &self,
        collection: &CollectionName,
        cancel: &CancellationToken,
        bound: Duration,
        action: &str,
        work: impl Future<Output = Result<T, SyncError>>,
    ) -> Result<T, SyncError> {
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(SyncError::Cancelled(collection.clone())),
            result = timeout(bound, work) => result.unwrap_or_else(|_| {
                tracing::warn!("{} '{}' timed out after {:?}", action, collection, bound);
                Err(SyncError::Timeout {
                    phase: SyncPhase::Fetching,
                    after: bound,
                })
            }),
        }
    }

    /// Write the merged set, then advance metadata to `started_at`.
    ///
    /// The store's save is all-or-nothing, so a failed write leaves its key
    /// untouched. A timed-out write may still have landed and is undone,
    /// along with the cache when the metadata step fails.
    async fn persist(
        &self,
        collection: &CollectionName,
        records: &[Record],
        started_at: DateTime<Utc>,
        epoch: ResetEpoch,
        previous_since: Option<DateTime<Utc>>,
        previous_raw: Option<&str>,
    ) -> Result<(), SyncError> {
        let bound = self.options.persist_timeout;
        let timed_out = || SyncError::Timeout {
            phase: SyncPhase::Persisting,
            after: bound,
        };

        match timeout(bound, self.cache.save(collection, records)).await {
            Ok(Ok(())) => {}
            Ok(Err(error)) => return Err(SyncError::Persistence(error)),
            Err(_) => {
                tracing::warn!(
                    "Writing cache for '{}' timed out after {:?}",
                    collection,
                    bound
                );
                self.restore_cache(collection, previous_raw).await;
                return Err(timed_out());
            }
        }

        let advance = self
            .timestamps
            .advance_unless_reset(collection, started_at, epoch);
        match timeout(bound, advance).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(error)) => {
                self.restore_cache(collection, previous_raw).await;
                Err(SyncError::Persistence(error))
            }
            Err(_) => {
                tracing::warn!(
                    "Advancing sync metadata for '{}' timed out after {:?}",
                    collection,
                    bound
                );
                self.restore_cache(collection, previous_raw).await;
                if let Err(error) = self
                    .timestamps
                    .restore_unless_reset(collection, previous_since, epoch)
                    .await
                {
                    tracing::error!(
                        "Failed to restore sync metadata for '{}' after aborted sync: {}",
                        collection,
                        error
                    );
                }
                Err(timed_out())
            }
        }
    }

    async fn restore_cache(&self, collection: &CollectionName, previous_raw: Option<&str>) {
        if let Err(error) = self.cache.restore(collection, previous_raw).await {
            tracing::error!(
                "Failed to restore cached '{}' after aborted sync: {}",
                collection,
                error
            );
        }
    }

    fn claim(&self, collection: &CollectionName) -> Result<InFlightGuard<'_>, SyncError> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(collection.clone()) {
            return Err(SyncError::InFlight(collection.clone()));
        }
        Ok(InFlightGuard {
            in_flight: &self.in_flight,
            collection: collection.clone(),
        })
    }

    fn set_phase(&self, collection: &CollectionName, phase: SyncPhase) {
        tracing::debug!("'{}' -> {}", collection, phase);
        self.phases
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(collection.clone(), phase);
    }
}

/// Releases a collection's in-flight slot when the cycle ends or is dropped
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<CollectionName>>,
    collection: CollectionName,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.collection);
    }
}
