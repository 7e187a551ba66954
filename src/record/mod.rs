//! Normalized listing records and run snapshots
//!
//! A [`Record`] is a partial field mapping: every record carries the identity fields
//! (`source_id`, `source_name`, `endpoint`, `record_id`, `fetched_at`) and whatever
//! source-specific fields could be extracted. Absent fields are omitted, never null.

mod builder;
mod snapshot;

pub use builder::RecordBuilder;
pub use snapshot::{Snapshot, SnapshotBuilder};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

/// Field names reserved for the identity part of a record
pub const RESERVED_FIELDS: [&str; 5] = [
    "source_id",
    "source_name",
    "endpoint",
    "record_id",
    "fetched_at",
];

/// One normalized listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub source_id: String,
    pub source_name: String,
    pub endpoint: String,
    pub record_id: String,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl Record {
    /// Looks up a source-specific field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Source-specific field as a string, if it is one
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// All source-specific fields, keyed by name
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Human label for progress output
    pub fn title(&self) -> &str {
        self.field_str("title").unwrap_or("Unknown")
    }
}

/// Derives a record identifier from an endpoint
///
/// Uses the last non-empty path segment, ignoring query and fragment. Falls back to
/// the host for root URLs and to the raw endpoint when nothing better exists.
///
/// # Examples
///
/// ```
/// use rwa_watch::record::derive_record_id;
///
/// assert_eq!(derive_record_id("https://www.lofty.ai/property_deal/123-main-st"), "123-main-st");
/// assert_eq!(derive_record_id("https://realt.co/product/9943/?ref=x"), "9943");
/// assert_eq!(derive_record_id("/a"), "a");
/// ```
pub fn derive_record_id(endpoint: &str) -> String {
    let trimmed = endpoint.trim();

    if let Ok(url) = Url::parse(trimmed) {
        let last = url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(str::to_string);

        return match last {
            Some(segment) => segment,
            None => url
                .host_str()
                .map(str::to_string)
                .unwrap_or_else(|| trimmed.to_string()),
        };
    }

    let path = trimmed
        .split(['?', '#'])
        .next()
        .unwrap_or(trimmed);

    path.split('/')
        .filter(|s| !s.is_empty())
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| trimmed.to_string())
}
