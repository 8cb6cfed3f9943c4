use std::io;

use smartsync_core::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] smartsync_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(
        "No remote configured. Run `smartsync config init --remote-url <URL>` or set SMARTSYNC_REMOTE_URL."
    )]
    RemoteNotConfigured,
    #[error(
        "No collections to sync. Name them on the command line or run `smartsync config init --collection <NAME>`."
    )]
    NoCollections,
    #[error("{failed} of {total} collection(s) failed to sync")]
    SyncFailed { failed: usize, total: usize },
}
