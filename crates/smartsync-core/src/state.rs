//! Sync cycle state types.

use serde::Serialize;
use std::fmt;

/// Phase of one collection's sync cycle.
///
/// `Idle → Fetching → Merging → Persisting → Done`; any phase may end in
/// `Failed`, which leaves the previous cache and metadata in place.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncPhase {
    #[default]
    Idle,
    Fetching,
    Merging,
    Persisting,
    Done,
    Failed,
}

impl SyncPhase {
    /// Whether a cycle is currently running in this phase
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Fetching | Self::Merging | Self::Persisting)
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Merging => "merging",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_phases() {
        assert!(!SyncPhase::Idle.is_active());
        assert!(SyncPhase::Fetching.is_active());
        assert!(SyncPhase::Persisting.is_active());
        assert!(!SyncPhase::Done.is_active());
        assert!(!SyncPhase::Failed.is_active());
    }

    #[test]
    fn test_display_matches_serde() {
        assert_eq!(SyncPhase::Merging.to_string(), "merging");
        assert_eq!(
            serde_json::to_string(&SyncPhase::Merging).unwrap(),
            "\"merging\""
        );
    }
}
