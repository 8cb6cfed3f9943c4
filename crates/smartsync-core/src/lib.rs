//! smartsync-core - Core library for smartsync
//!
//! Local-first collection cache kept current by incremental ("smart") sync:
//! records, the timestamp-driven merge engine, local and remote store
//! adapters, and the per-collection sync orchestrator used by the CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod remote;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;

pub use config::SmartSyncConfig;
pub use error::{Error, Result};
pub use merge::{merge, MergeResult};
pub use models::{CollectionName, Record, RecordId, SyncMetadata};
pub use state::SyncPhase;
pub use sync::{SyncError, SyncOptions, SyncOrchestrator, SyncReport};
