//! Collection naming

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::Error;

/// Store key reserved for [`SyncMetadata`](super::SyncMetadata); never a valid collection name.
pub const SYNC_METADATA_KEY: &str = "__sync_metadata";

static COLLECTION_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_][A-Za-z0-9_.-]*$").expect("Invalid regex"));

/// Validated name of a synchronized collection (e.g. `students`, `officers`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CollectionName(String);

impl CollectionName {
    /// Validate and wrap a collection name.
    ///
    /// Surrounding whitespace is trimmed. Names must match
    /// `[A-Za-z0-9_][A-Za-z0-9_.-]*` and must not collide with the
    /// metadata key.
    pub fn new(name: impl AsRef<str>) -> Result<Self, Error> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(Error::InvalidInput(
                "collection name must not be empty".to_string(),
            ));
        }
        if name == SYNC_METADATA_KEY {
            return Err(Error::InvalidInput(format!(
                "`{SYNC_METADATA_KEY}` is reserved for sync metadata"
            )));
        }
        if !COLLECTION_NAME.is_match(name) {
            return Err(Error::InvalidInput(format!(
                "invalid collection name `{name}`"
            )));
        }
        Ok(Self(name.to_string()))
    }

    /// Borrow the name
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CollectionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for CollectionName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CollectionName> for String {
    fn from(value: CollectionName) -> Self {
        value.0
    }
}

impl AsRef<str> for CollectionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["students", "officers", "club_events", "v2.members", "_drafts"] {
            assert_eq!(CollectionName::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn test_name_is_trimmed() {
        assert_eq!(CollectionName::new("  officers ").unwrap().as_str(), "officers");
    }

    #[test]
    fn test_invalid_names() {
        assert!(CollectionName::new("").is_err());
        assert!(CollectionName::new("   ").is_err());
        assert!(CollectionName::new("with space").is_err());
        assert!(CollectionName::new("a/b").is_err());
        assert!(CollectionName::new("-leading").is_err());
    }

    #[test]
    fn test_metadata_key_is_reserved() {
        let error = CollectionName::new(SYNC_METADATA_KEY).unwrap_err();
        assert!(error.to_string().contains("reserved"));
    }

    #[test]
    fn test_deserialize_validates() {
        assert!(serde_json::from_str::<CollectionName>("\"students\"").is_ok());
        assert!(serde_json::from_str::<CollectionName>("\"bad name\"").is_err());
    }
}
