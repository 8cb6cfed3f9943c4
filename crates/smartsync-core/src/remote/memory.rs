//! In-process remote collection host

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{RemoteError, RemoteSource, UpdatedSince};
use crate::models::{CollectionName, Record};

/// [`RemoteSource`] serving collections from memory.
///
/// Can be configured to reject filtered queries, to go offline, or to add
/// latency, which makes it the stand-in for a hosted store in tests and demos.
#[derive(Debug)]
pub struct MemoryRemote {
    collections: RwLock<HashMap<String, Vec<Record>>>,
    supports_filter: bool,
    latency: Option<Duration>,
    offline: AtomicBool,
    queries: Mutex<Vec<(String, Option<DateTime<Utc>>)>>,
}

impl Default for MemoryRemote {
    fn default() -> Self {
        Self {
            collections: RwLock::default(),
            supports_filter: true,
            latency: None,
            offline: AtomicBool::new(false),
            queries: Mutex::default(),
        }
    }
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection, replacing any previous contents
    #[must_use]
    pub fn with_records(mut self, collection: &CollectionName, records: Vec<Record>) -> Self {
        self.collections
            .get_mut()
            .insert(collection.as_str().to_string(), records);
        self
    }

    /// Whether `updatedAt` filters can be evaluated (default: `true`)
    #[must_use]
    pub const fn with_filter_support(mut self, supported: bool) -> Self {
        self.supports_filter = supported;
        self
    }

    /// Delay every query by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Simulate a network outage for subsequent queries
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Insert or replace a record by identifier
    pub async fn upsert(&self, collection: &CollectionName, record: Record) {
        let mut collections = self.collections.write().await;
        let records = collections
            .entry(collection.as_str().to_string())
            .or_default();
        if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
            *existing = record;
        } else {
            records.push(record);
        }
    }

    /// Every query received so far as `(collection, since)`
    pub async fn queries(&self) -> Vec<(String, Option<DateTime<Utc>>)> {
        self.queries.lock().await.clone()
    }
}

impl RemoteSource for MemoryRemote {
    async fn query(
        &self,
        collection: &CollectionName,
        filter: Option<UpdatedSince>,
    ) -> Result<Vec<Record>, RemoteError> {
        self.queries
            .lock()
            .await
            .push((collection.as_str().to_string(), filter.map(|f| f.0)));

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Transport("remote unreachable".to_string()));
        }
        if filter.is_some() && !self.supports_filter {
            return Err(RemoteError::QueryUnsupported(
                "updatedAt index missing".to_string(),
            ));
        }

        let collections = self.collections.read().await;
        let records = collections
            .get(collection.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default();

        Ok(match filter {
            Some(UpdatedSince(since)) => records
                .iter()
                .filter(|record| record.updated_at.is_some_and(|at| at >= since))
                .cloned()
                .collect(),
            None => records.to_vec(),
        })
    }
}
