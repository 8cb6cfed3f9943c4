//! Sync metadata model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CollectionName;

/// Last successful sync instant per collection.
///
/// Serializes as a plain JSON object of RFC 3339 strings so an operator can
/// read it or delete entries by hand:
///
/// ```json
/// {"officers": "2024-01-02T10:00:00Z", "students": "2024-01-02T09:58:12Z"}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SyncMetadata(BTreeMap<String, DateTime<Utc>>);

impl SyncMetadata {
    /// Instant of the last successful sync, if any
    #[must_use]
    pub fn last_synced(&self, collection: &CollectionName) -> Option<DateTime<Utc>> {
        self.0.get(collection.as_str()).copied()
    }

    /// Record a successful sync, overwriting any previous instant
    pub fn set(&mut self, collection: &CollectionName, instant: DateTime<Utc>) {
        self.0.insert(collection.as_str().to_string(), instant);
    }

    /// Drop one collection's entry; returns whether it existed
    pub fn remove(&mut self, collection: &CollectionName) -> bool {
        self.0.remove(collection.as_str()).is_some()
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.0.clear();
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries ordered by collection name
    pub fn iter(&self) -> impl Iterator<Item = (&str, DateTime<Utc>)> {
        self.0.iter().map(|(name, instant)| (name.as_str(), *instant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn officers() -> CollectionName {
        CollectionName::new("officers").unwrap()
    }

    #[test]
    fn test_serializes_as_iso_map() {
        let mut metadata = SyncMetadata::default();
        metadata.set(
            &officers(),
            Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap(),
        );

        let json = serde_json::to_string(&metadata).unwrap();
        assert_eq!(json, r#"{"officers":"2024-01-02T10:00:00Z"}"#);

        let parsed: SyncMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, metadata);
    }

    #[test]
    fn test_accepts_offset_instants() {
        let parsed: SyncMetadata =
            serde_json::from_str(r#"{"officers":"2024-01-02T12:00:00+02:00"}"#).unwrap();
        assert_eq!(
            parsed.last_synced(&officers()),
            Some(Utc.with_ymd_and_hms(2024, 1, 2, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_set_overwrites_and_remove() {
        let mut metadata = SyncMetadata::default();
        let first = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();

        metadata.set(&officers(), first);
        metadata.set(&officers(), second);
        assert_eq!(metadata.len(), 1);
        assert_eq!(metadata.last_synced(&officers()), Some(second));

        assert!(metadata.remove(&officers()));
        assert!(!metadata.remove(&officers()));
        assert!(metadata.is_empty());
    }
}
