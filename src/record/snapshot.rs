use crate::record::Record;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// The ordered records of one run of one source
///
/// Produced once by [`SnapshotBuilder::finish`] and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    source_id: String,
    fetched_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl Snapshot {
    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct record identifiers in this snapshot
    pub fn record_ids(&self) -> BTreeSet<String> {
        self.records.iter().map(|r| r.record_id.clone()).collect()
    }
}

/// Run-scoped accumulator for records
///
/// Owned by the run controller for the duration of one run.
#[derive(Debug)]
pub struct SnapshotBuilder {
    source_id: String,
    fetched_at: DateTime<Utc>,
    records: Vec<Record>,
}

impl SnapshotBuilder {
    pub fn new(source_id: &str, fetched_at: DateTime<Utc>) -> Self {
        Self {
            source_id: source_id.to_string(),
            fetched_at,
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: Record) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn finish(self) -> Snapshot {
        Snapshot {
            source_id: self.source_id,
            fetched_at: self.fetched_at,
            records: self.records,
        }
    }
}
