//! Incremental ("smart") sync of cached collections against a remote store.

mod cache;
mod orchestrator;
mod timestamps;

pub use cache::RecordCache;
pub use orchestrator::{SyncOptions, SyncOrchestrator, SyncReport};
pub use timestamps::{ResetEpoch, TimestampStore};

use std::time::Duration;

use thiserror::Error;

use crate::models::CollectionName;
use crate::remote::RemoteError;
use crate::state::SyncPhase;

/// Why a sync cycle ended in [`SyncPhase::Failed`].
///
/// Every variant is recoverable: the previous cache and metadata are intact
/// and the caller decides whether and when to retry.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or authentication failure reaching the remote store
    #[error("Remote transport error: {0}")]
    Transport(String),
    /// A suspension point exceeded its configured bound
    #[error("Sync timed out while {phase} (after {after:?})")]
    Timeout { phase: SyncPhase, after: Duration },
    /// The local cache or metadata could not be read or written
    #[error("Local persistence failed: {0}")]
    Persistence(#[source] crate::Error),
    /// Cached value for the collection is not a valid record array
    #[error("Cached data for '{collection}' is unreadable: {reason}")]
    Corrupt {
        collection: CollectionName,
        reason: String,
    },
    /// Cancelled before persisting began
    #[error("Sync of '{0}' was cancelled")]
    Cancelled(CollectionName),
    /// Another cycle for the same collection has not finished yet
    #[error("A sync of '{0}' is already in progress")]
    InFlight(CollectionName),
}

impl From<RemoteError> for SyncError {
    fn from(error: RemoteError) -> Self {
        // fallback already consumed QueryUnsupported for filtered queries
        match error {
            RemoteError::Transport(message) | RemoteError::QueryUnsupported(message) => {
                Self::Transport(message)
            }
        }
    }
}
