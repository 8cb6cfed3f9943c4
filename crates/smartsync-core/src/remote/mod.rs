//! Remote document-store access.
//!
//! [`RemoteSource`] is the raw query capability of the hosted store.
//! [`RemoteFetcher`] layers the incremental-fetch policy on top: ask for the
//! delta since the last sync, and fall back to the whole collection when the
//! store cannot run the filtered query.

mod http;
mod memory;

pub use http::HttpRemote;
pub use memory::MemoryRemote;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{CollectionName, Record};

/// Failures reported by a [`RemoteSource`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Network, authentication, or server failure
    #[error("Remote transport error: {0}")]
    Transport(String),
    /// The store cannot evaluate the requested filter (missing index, unsupported operator)
    #[error("Filtered query unsupported: {0}")]
    QueryUnsupported(String),
}

/// Server-side predicate `updatedAt >= since`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatedSince(pub DateTime<Utc>);

/// Trait for querying a named remote collection (async)
#[allow(async_fn_in_trait)]
pub trait RemoteSource {
    /// Run one query; `None` fetches the whole collection
    async fn query(
        &self,
        collection: &CollectionName,
        filter: Option<UpdatedSince>,
    ) -> Result<Vec<Record>, RemoteError>;
}

impl<T: RemoteSource> RemoteSource for std::sync::Arc<T> {
    async fn query(
        &self,
        collection: &CollectionName,
        filter: Option<UpdatedSince>,
    ) -> Result<Vec<Record>, RemoteError> {
        (**self).query(collection, filter).await
    }
}

/// Records returned by one fetch and how they were obtained
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub records: Vec<Record>,
    /// `false` for first syncs and for fallbacks; the records may then
    /// include data older than the requested instant
    pub used_filtered_query: bool,
}

impl FetchOutcome {
    /// Drop records provably older than `since` (untimestamped records are kept).
    ///
    /// No-op for filtered results, which the server already constrained.
    #[must_use]
    pub fn filter_client_side(mut self, since: DateTime<Utc>) -> Self {
        if !self.used_filtered_query {
            self.records.retain(|record| record.updated_since(since));
        }
        self
    }
}

/// Incremental fetch policy over a [`RemoteSource`]
#[derive(Debug, Clone)]
pub struct RemoteFetcher<R> {
    source: R,
}

impl<R: RemoteSource> RemoteFetcher<R> {
    pub const fn new(source: R) -> Self {
        Self { source }
    }

    pub const fn source(&self) -> &R {
        &self.source
    }

    /// Fetch records updated at or after `since`, or everything when `since` is absent.
    ///
    /// A [`RemoteError::QueryUnsupported`] from the filtered query triggers
    /// one unfiltered retry and is never returned to the caller.
    pub async fn fetch_since(
        &self,
        collection: &CollectionName,
        since: Option<DateTime<Utc>>,
    ) -> Result<FetchOutcome, RemoteError> {
        let Some(since) = since else {
            tracing::debug!("Fetching full collection '{}'", collection);
            return self.fetch_all(collection).await;
        };

        match self
            .source
            .query(collection, Some(UpdatedSince(since)))
            .await
        {
            Ok(records) => {
                tracing::debug!(
                    "Filtered fetch of '{}' since {} returned {} records",
                    collection,
                    since.to_rfc3339(),
                    records.len()
                );
                Ok(FetchOutcome {
                    records,
                    used_filtered_query: true,
                })
            }
            Err(RemoteError::QueryUnsupported(reason)) => {
                tracing::warn!(
                    "Filtered query on '{}' unsupported ({}); falling back to full fetch",
                    collection,
                    reason
                );
                self.fetch_all(collection).await
            }
            Err(error) => Err(error),
        }
    }

    async fn fetch_all(&self, collection: &CollectionName) -> Result<FetchOutcome, RemoteError> {
        match self.source.query(collection, None).await {
            Ok(records) => Ok(FetchOutcome {
                records,
                used_filtered_query: false,
            }),
            // an unfiltered query has nothing left to fall back to
            Err(RemoteError::QueryUnsupported(reason)) => Err(RemoteError::Transport(format!(
                "unfiltered query rejected: {reason}"
            ))),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn officers() -> CollectionName {
        CollectionName::new("officers").unwrap()
    }

    fn seeded(remote: MemoryRemote) -> MemoryRemote {
        remote.with_records(
            &officers(),
            vec![
                Record::new("1").with_updated_at(day(1)),
                Record::new("2").with_updated_at(day(3)),
                Record::new("3"),
            ],
        )
    }

    #[tokio::test]
    async fn test_absent_since_fetches_everything() {
        let fetcher = RemoteFetcher::new(seeded(MemoryRemote::new()));

        let outcome = fetcher.fetch_since(&officers(), None).await.unwrap();
        assert_eq!(outcome.records.len(), 3);
        assert!(!outcome.used_filtered_query);
        assert_eq!(
            fetcher.source().queries().await,
            vec![("officers".to_string(), None)]
        );
    }

    #[tokio::test]
    async fn test_since_uses_filtered_query() {
        let fetcher = RemoteFetcher::new(seeded(MemoryRemote::new()));

        let outcome = fetcher.fetch_since(&officers(), Some(day(2))).await.unwrap();
        assert!(outcome.used_filtered_query);
        let ids: Vec<_> = outcome.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2"]);
    }

    #[tokio::test]
    async fn test_unsupported_filter_falls_back_to_full_fetch() {
        let fetcher =
            RemoteFetcher::new(seeded(MemoryRemote::new().with_filter_support(false)));

        let outcome = fetcher.fetch_since(&officers(), Some(day(2))).await.unwrap();
        assert!(!outcome.used_filtered_query);
        assert_eq!(outcome.records.len(), 3);
        assert_eq!(
            fetcher.source().queries().await,
            vec![
                ("officers".to_string(), Some(day(2))),
                ("officers".to_string(), None)
            ]
        );
    }

    #[tokio::test]
    async fn test_transport_error_is_returned() {
        let remote = seeded(MemoryRemote::new());
        remote.set_offline(true);
        let fetcher = RemoteFetcher::new(remote);

        let error = fetcher
            .fetch_since(&officers(), Some(day(2)))
            .await
            .unwrap_err();
        assert!(matches!(error, RemoteError::Transport(_)));
        // no fallback attempt after a transport failure
        assert_eq!(fetcher.source().queries().await.len(), 1);
    }

    #[test]
    fn test_client_side_filter_only_applies_to_unfiltered_results() {
        let records = vec![
            Record::new("old").with_updated_at(day(1)),
            Record::new("new").with_updated_at(day(5)),
            Record::new("unknown"),
        ];

        let unfiltered = FetchOutcome {
            records: records.clone(),
            used_filtered_query: false,
        }
        .filter_client_side(day(2));
        let ids: Vec<_> = unfiltered.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "unknown"]);

        let filtered = FetchOutcome {
            records: records.clone(),
            used_filtered_query: true,
        }
        .filter_client_side(day(2));
        assert_eq!(filtered.records, records);
    }
}
