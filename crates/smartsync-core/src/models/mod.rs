//! Data models for smartsync

mod collection;
mod record;
mod sync_metadata;

pub use collection::{CollectionName, SYNC_METADATA_KEY};
pub use record::{Record, RecordId};
pub use sync_metadata::SyncMetadata;
