//! Change detection between a run's snapshot and the previous history

use crate::record::{Record, Snapshot};
use crate::store::History;

/// Returns every record of `snapshot` whose id is not in `previous`
///
/// Output follows snapshot order. With no previous history (first run of a source)
/// every record is new.
pub fn detect_new<'a>(previous: Option<&History>, snapshot: &'a Snapshot) -> Vec<&'a Record> {
    detect_in(previous, snapshot.records())
}

/// Slice form of [`detect_new`]
pub fn detect_in<'a>(previous: Option<&History>, records: &'a [Record]) -> Vec<&'a Record> {
    match previous {
        None => records.iter().collect(),
        Some(history) => records
            .iter()
            .filter(|r| !history.contains(&r.record_id))
            .collect(),
    }
}
