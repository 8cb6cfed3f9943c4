//! Record model

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Stable unique identifier of a record within its collection
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Create an identifier from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the identifier text
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A uniquely identified, timestamped unit of application data.
///
/// Serialized as a flat JSON object: `id` and `updatedAt` are lifted into
/// typed fields, every other key lands in [`Record::attributes`] and is
/// written back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identifier
    pub id: RecordId,
    /// Last update instant; `None` sorts before every real instant
    #[serde(
        rename = "updatedAt",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_instant"
    )]
    pub updated_at: Option<DateTime<Utc>>,
    /// Remaining application fields
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Record {
    /// Create a record with no timestamp and no attributes
    pub fn new(id: impl Into<RecordId>) -> Self {
        Self {
            id: id.into(),
            updated_at: None,
            attributes: Map::new(),
        }
    }

    /// Set the update instant
    #[must_use]
    pub const fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = Some(updated_at);
        self
    }

    /// Set an attribute value
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up an attribute by name
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Whether this record was updated at or after `since`.
    ///
    /// Records without a timestamp are reported as updated, since nothing
    /// proves they are stale.
    #[must_use]
    pub fn updated_since(&self, since: DateTime<Utc>) -> bool {
        self.updated_at.is_none_or(|updated_at| updated_at >= since)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstant {
    Text(String),
    Millis(i64),
}

/// Accepts RFC 3339 text or integer Unix milliseconds; `null` maps to `None`.
fn deserialize_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawInstant>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawInstant::Text(text)) => DateTime::parse_from_rfc3339(text.trim())
            .map(|instant| Some(instant.with_timezone(&Utc)))
            .map_err(|error| D::Error::custom(format!("invalid updatedAt `{text}`: {error}"))),
        Some(RawInstant::Millis(millis)) => DateTime::from_timestamp_millis(millis)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("updatedAt out of range: {millis}"))),
    }
}
